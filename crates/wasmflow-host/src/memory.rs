//! Bounds-checked access to an instance's linear memory.

use std::ops::Range;

use crate::error::HostError;

/// A view of a module instance's linear memory.
///
/// Implementors only expose the raw bytes; [`GuestMemory::read`] and
/// [`GuestMemory::write`] validate every `(offset, count)` range against the
/// current size before touching anything, so a failed access has no effect.
pub trait GuestMemory {
  fn data(&self) -> &[u8];

  fn data_mut(&mut self) -> &mut [u8];

  /// Current memory size in bytes.
  fn size(&self) -> usize {
    self.data().len()
  }

  /// Borrow `count` bytes starting at `offset`.
  fn read(&self, offset: u32, count: u32) -> Result<&[u8], HostError> {
    let range = checked_range(offset, u64::from(count), self.size())?;
    Ok(&self.data()[range])
  }

  /// Copy `bytes` into memory starting at `offset`.
  fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), HostError> {
    let range = checked_range(offset, bytes.len() as u64, self.size())?;
    self.data_mut()[range].copy_from_slice(bytes);
    Ok(())
  }
}

fn checked_range(offset: u32, count: u64, size: usize) -> Result<Range<usize>, HostError> {
  let start = u64::from(offset);
  match start.checked_add(count) {
    Some(end) if end <= size as u64 => Ok(start as usize..end as usize),
    _ => Err(HostError::MemoryAccess {
      offset,
      count,
      size,
    }),
  }
}

/// Plain in-process memory, used to exercise host calls without an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceMemory(pub Vec<u8>);

impl SliceMemory {
  /// Zeroed memory of `size` bytes.
  pub fn new(size: usize) -> Self {
    Self(vec![0; size])
  }
}

impl GuestMemory for SliceMemory {
  fn data(&self) -> &[u8] {
    &self.0
  }

  fn data_mut(&mut self) -> &mut [u8] {
    &mut self.0
  }
}
