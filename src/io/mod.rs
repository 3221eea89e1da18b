mod local;

pub use local::LocalFileReader;

use anyhow::Result;

/// Trait for random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Fill the whole buffer from the specified offset
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.read_at(offset, buf)?;
            if n == 0 {
                anyhow::bail!("Unexpected end of data at offset {}", offset);
            }
            offset += n as u64;
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
