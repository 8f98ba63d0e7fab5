//! Disassembly rendering flags and the scoped override guard.

use std::ops::{Deref, DerefMut};

use super::Disassembly;

bitflags::bitflags! {
    /// Independent rendering toggles. Composition is bitwise OR and
    /// [`DisassemblyOptions::empty`] is the identity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DisassemblyOptions: u32 {
        /// Print the source location under each function header.
        const INCLUDE_SOURCE          = 1 << 0;
        /// Tag function headers with `#<id>`.
        const INCLUDE_FUNCTION_IDS    = 1 << 1;
        /// Prefix instructions with their virtual offset.
        const INCLUDE_VIRTUAL_OFFSETS = 1 << 2;
        /// Aligned columns, offsets and jump labels.
        const PRETTY                  = 1 << 3;
        /// objdump-style addresses and raw bytes.
        const OBJDUMP                 = 1 << 4;
    }
}

/// The three mutually exclusive output styles selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisassemblyFormat {
    /// Legacy format.
    Raw,
    #[default]
    Pretty,
    Objdump,
}

impl DisassemblyFormat {
    pub fn flags(self) -> DisassemblyOptions {
        match self {
            DisassemblyFormat::Raw => DisassemblyOptions::empty(),
            DisassemblyFormat::Pretty => DisassemblyOptions::PRETTY,
            DisassemblyFormat::Objdump => DisassemblyOptions::OBJDUMP,
        }
    }
}

impl DisassemblyOptions {
    /// Bitwise union of two flag sets.
    pub const fn compose(self, other: Self) -> Self {
        self.union(other)
    }

    /// Session baseline: source interleaving and function ids, plus the
    /// selected output style.
    pub fn session_default(format: DisassemblyFormat) -> Self {
        (Self::INCLUDE_SOURCE | Self::INCLUDE_FUNCTION_IDS).compose(format.flags())
    }
}

/// Adds flags to a disassembler for the lifetime of the guard.
///
/// The prior options are restored on drop, so early returns and `?` leave
/// the session state exactly as it was before the override.
pub struct OptionsOverride<'a, D: Disassembly + ?Sized> {
    target: &'a mut D,
    saved: DisassemblyOptions,
}

impl<'a, D: Disassembly + ?Sized> OptionsOverride<'a, D> {
    pub fn new(target: &'a mut D, extra: DisassemblyOptions) -> Self {
        let saved = target.options();
        target.set_options(saved.compose(extra));
        Self { target, saved }
    }

    /// Options that will be restored on drop.
    pub fn saved(&self) -> DisassemblyOptions {
        self.saved
    }
}

impl<D: Disassembly + ?Sized> Deref for OptionsOverride<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &*self.target
    }
}

impl<D: Disassembly + ?Sized> DerefMut for OptionsOverride<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut *self.target
    }
}

impl<D: Disassembly + ?Sized> Drop for OptionsOverride<'_, D> {
    fn drop(&mut self) {
        self.target.set_options(self.saved);
    }
}
