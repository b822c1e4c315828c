//! Raw byte transport to the matrix.
//!
//! [`BusWrite`] is the only thing the rest of the crate knows about the bus:
//! hand it a slice, get back how many bytes the transport accepted. Byte
//! counting and short-write policy live in [`crate::MatrixSink`].

use std::io;

/// A write primitive bound to one device on the bus.
pub trait BusWrite: Send {
    /// Writes `bytes` as a single transfer and returns the accepted count.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

impl<W: BusWrite + ?Sized> BusWrite for Box<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }
}

#[cfg(target_os = "linux")]
pub use linux::I2cDevice;

#[cfg(target_os = "linux")]
mod linux {
    use super::BusWrite;
    use std::fs::{File, OpenOptions};
    use std::io::{self, Write};
    use std::os::fd::AsRawFd;
    use std::path::{Path, PathBuf};

    /// `I2C_SLAVE` from `<linux/i2c-dev.h>`: bind the fd to a 7-bit address.
    const I2C_SLAVE: u16 = 0x0703;

    /// An i2c-dev character device (`/dev/i2c-N`) bound to one address.
    ///
    /// Each `write` on the fd becomes one I2C write transaction, which is
    /// what the matrix controller needs to latch a full frame.
    #[derive(Debug)]
    pub struct I2cDevice {
        file: File,
        path: PathBuf,
        address: u16,
    }

    impl I2cDevice {
        /// Opens `path` read-write and selects `address` as the target.
        ///
        /// # Errors
        /// Fails if the device node can't be opened or the kernel rejects
        /// the address (for example when another driver already claims it).
        pub fn open<P: AsRef<Path>>(path: P, address: u16) -> io::Result<Self> {
            let path = path.as_ref().to_path_buf();
            let file = OpenOptions::new().read(true).write(true).open(&path)?;

            // SAFETY: the fd is valid for the lifetime of `file` and I2C_SLAVE
            // takes the address by value, so no memory is shared with the kernel.
            let rc = unsafe {
                libc::ioctl(
                    file.as_raw_fd(),
                    I2C_SLAVE as _,
                    libc::c_ulong::from(address),
                )
            };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                file,
                path,
                address,
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub fn address(&self) -> u16 {
            self.address
        }
    }

    impl BusWrite for I2cDevice {
        #[inline]
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.file.write(bytes)
        }
    }
}
