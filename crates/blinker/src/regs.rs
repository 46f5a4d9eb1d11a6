// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Word-wide access to memory-mapped registers.
///
/// Every call must reach the backing store exactly once: no caching, no
/// merging of adjacent accesses. The provided helpers are all a single read
/// followed by a single write.
pub trait RegisterAccess {
    fn read(&mut self, addr: u32) -> u32;
    fn write(&mut self, addr: u32, value: u32);

    fn modify<F>(&mut self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(addr);
        self.write(addr, f(value));
    }

    fn set_bits(&mut self, addr: u32, mask: u32) {
        self.modify(addr, |v| v | mask);
    }

    fn clear_bits(&mut self, addr: u32, mask: u32) {
        self.modify(addr, |v| v & !mask);
    }

    fn toggle_bits(&mut self, addr: u32, mask: u32) {
        self.modify(addr, |v| v ^ mask);
    }
}

impl<R: RegisterAccess + ?Sized> RegisterAccess for &mut R {
    fn read(&mut self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }
}

/// Volatile access to the real peripheral address space.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Only the addresses in [`crate::map`] may be passed to this accessor,
    /// and only on an STM32F103 where they are valid device registers. Nothing
    /// else may drive the same registers while the `Mmio` is alive.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    #[inline(always)]
    fn read(&mut self, addr: u32) -> u32 {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, addr: u32, value: u32) {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}
