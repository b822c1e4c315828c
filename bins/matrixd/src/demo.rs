// Demo traffic: random frame producers and a subscriber that logs what the
// matrix shows. Every thread here exits when the quit channel disconnects.

use crossbeam_channel::{Receiver, select};
use matrixd_config::DemoConfig;
use matrixd_core::MatrixController;
use matrixd_frame::{Frame, PIXELS};
use rand::Rng;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

pub fn start(
    controller: &MatrixController,
    config: &DemoConfig,
    quit: &Receiver<()>,
) -> io::Result<Vec<JoinHandle<()>>> {
    let interval = Duration::from_millis(config.interval_ms);
    let mut handles = Vec::with_capacity(config.producers + 1);

    if config.log_frames {
        handles.push(spawn_console(controller, quit.clone())?);
    }
    for n in 0..config.producers {
        handles.push(spawn_knocker(n, controller.clone(), quit.clone(), interval)?);
    }
    info!(producers = config.producers, ?interval, "demo traffic started");
    Ok(handles)
}

/// Waits for every helper thread and returns how many of them panicked.
pub fn join(helpers: Vec<JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for helper in helpers {
        let name = helper.thread().name().unwrap_or("demo").to_owned();
        if helper.join().is_err() {
            warn!(thread = %name, "demo helper panicked");
            panicked += 1;
        }
    }
    panicked
}

/// Pushes a random frame every `interval` until told to quit or the
/// controller goes away.
fn spawn_knocker(
    n: usize,
    controller: MatrixController,
    quit: Receiver<()>,
    interval: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("knocker-{n}"))
        .spawn(move || {
            let mut rng = rand::thread_rng();
            loop {
                select! {
                    recv(quit) -> _ => break,
                    default(interval) => {
                        debug!("knock");
                        if controller.push(random_frame(&mut rng)).is_err() {
                            break;
                        }
                    }
                }
            }
        })
}

fn spawn_console(controller: &MatrixController, quit: Receiver<()>) -> io::Result<JoinHandle<()>> {
    let frames = controller.subscribe("console", 4);
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            loop {
                select! {
                    recv(quit) -> _ => break,
                    recv(frames) -> msg => match msg {
                        Ok(frame) => {
                            let (r, g, b) = mean_color(&frame);
                            info!(r, g, b, "frame displayed");
                        }
                        Err(_) => break,
                    },
                }
            }
        })
}

fn random_frame(rng: &mut impl Rng) -> Frame {
    let mut frame = Frame::blank();
    rng.fill(&mut frame.r[..]);
    rng.fill(&mut frame.g[..]);
    rng.fill(&mut frame.b[..]);
    frame
}

fn mean_color(frame: &Frame) -> (u8, u8, u8) {
    let mean = |channel: &[u8; PIXELS]| {
        (channel.iter().map(|&v| u32::from(v)).sum::<u32>() / PIXELS as u32) as u8
    };
    (mean(&frame.r), mean(&frame.g), mean(&frame.b))
}
