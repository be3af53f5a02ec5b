//! The byte transport a [`Transaction`](crate::transaction::Transaction) runs over.
//!
//! Opening and closing the physical link is the transport's own business; the
//! transaction only writes whole frames and polls for whatever bytes have
//! arrived. Both calls use [`nb`] semantics:
//!
//! | Call | `Ok` | `WouldBlock` | `Other` |
//! |------|------|--------------|---------|
//! | [`write`](FrameTransport::write) | every byte accepted | link busy, failed attempt | failed attempt |
//! | [`read_available`](FrameTransport::read_available) | `n` bytes copied (`0` = nothing) | nothing available | failed attempt |
//!
//! Neither call may block indefinitely.

/// A point-to-point byte link to the MCU.
pub trait FrameTransport {
    /// Transport-specific error.
    type Error;

    /// Writes `bytes` in full.
    ///
    /// A partial write must be reported as an error.
    fn write(&mut self, bytes: &[u8]) -> nb::Result<(), Self::Error>;

    /// Copies currently buffered inbound bytes into `buf` and returns how many
    /// were copied.
    fn read_available(&mut self, buf: &mut [u8]) -> nb::Result<usize, Self::Error>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for &mut T {
    type Error = T::Error;

    fn write(&mut self, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        (**self).write(bytes)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> nb::Result<usize, Self::Error> {
        (**self).read_available(buf)
    }
}

#[cfg(feature = "std")]
pub use io::IoTransport;

#[cfg(feature = "std")]
mod io {
    use super::FrameTransport;
    use std::io::{ErrorKind, Read, Write};

    /// Adapts any `Read + Write` handle, such as an opened serial port with a
    /// short read timeout, to [`FrameTransport`].
    ///
    /// `WouldBlock`, `TimedOut` and `Interrupted` errors become
    /// [`nb::Error::WouldBlock`].
    #[derive(Debug)]
    pub struct IoTransport<T> {
        inner: T,
    }

    impl<T: Read + Write> IoTransport<T> {
        /// Wraps `inner`.
        pub fn new(inner: T) -> Self {
            Self { inner }
        }

        /// Borrows the wrapped handle.
        pub fn get_ref(&self) -> &T {
            &self.inner
        }

        /// Unwraps the handle.
        pub fn into_inner(self) -> T {
            self.inner
        }
    }

    fn classify(err: std::io::Error) -> nb::Error<std::io::Error> {
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
                nb::Error::WouldBlock
            }
            _ => nb::Error::Other(err),
        }
    }

    impl<T: Read + Write> FrameTransport for IoTransport<T> {
        type Error = std::io::Error;

        fn write(&mut self, bytes: &[u8]) -> nb::Result<(), Self::Error> {
            self.inner.write_all(bytes).map_err(classify)?;
            self.inner.flush().map_err(classify)
        }

        fn read_available(&mut self, buf: &mut [u8]) -> nb::Result<usize, Self::Error> {
            self.inner.read(buf).map_err(classify)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::VecDeque;
        use std::vec::Vec;

        #[derive(Default)]
        struct Loopback {
            written: Vec<u8>,
            inbound: VecDeque<std::io::Result<Vec<u8>>>,
            fail_writes: bool,
        }

        impl Read for Loopback {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.inbound.pop_front() {
                    Some(Ok(chunk)) => {
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    Some(Err(e)) => Err(e),
                    None => Err(ErrorKind::TimedOut.into()),
                }
            }
        }

        impl Write for Loopback {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if self.fail_writes {
                    return Err(ErrorKind::BrokenPipe.into());
                }
                self.written.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        #[test]
        fn test_write_passes_bytes_through() {
            let mut transport = IoTransport::new(Loopback::default());
            assert!(transport.write(&[1, 2, 3]).is_ok());
            assert_eq!(transport.get_ref().written, [1, 2, 3]);
        }

        #[test]
        fn test_write_error_is_other() {
            let mut transport = IoTransport::new(Loopback {
                fail_writes: true,
                ..Loopback::default()
            });
            assert!(matches!(transport.write(&[1]), Err(nb::Error::Other(_))));
        }

        #[test]
        fn test_read_maps_timeouts_to_would_block() {
            let mut inbound = VecDeque::new();
            inbound.push_back(Ok(vec![9, 8]));
            inbound.push_back(Err(ErrorKind::Interrupted.into()));
            inbound.push_back(Err(ErrorKind::PermissionDenied.into()));
            let mut transport = IoTransport::new(Loopback {
                inbound,
                ..Loopback::default()
            });

            let mut buf = [0u8; 4];
            assert_eq!(transport.read_available(&mut buf).ok(), Some(2));
            assert_eq!(&buf[..2], &[9, 8]);
            assert!(matches!(
                transport.read_available(&mut buf),
                Err(nb::Error::WouldBlock)
            ));
            assert!(matches!(
                transport.read_available(&mut buf),
                Err(nb::Error::Other(_))
            ));
            assert!(matches!(
                transport.read_available(&mut buf),
                Err(nb::Error::WouldBlock)
            ));
            assert!(transport.into_inner().inbound.is_empty());
        }
    }
}
