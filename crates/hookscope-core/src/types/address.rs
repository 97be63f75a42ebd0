//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address in the inspected process
///
/// Node identity during traversal is address identity, so everything that
/// compares nodes goes through this type rather than raw `u64`s.
///
/// ## Example
///
/// ```rust
/// use hookscope_core::types::Address;
///
/// let node = Address::from(0x1018);
/// assert_eq!((node - 0x18).value(), 0x1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Subtract `offset` using the inspected process's integer width
    ///
    /// `width_bytes` is the size of a pointer in the inspected process. The
    /// subtraction wraps modulo `2^(8 * width_bytes)`, exactly as the same
    /// arithmetic on `uintptr_t` would inside the process.
    ///
    /// ```rust
    /// use hookscope_core::types::Address;
    ///
    /// let addr = Address::from(0x10);
    /// assert_eq!(addr.wrapping_sub_in_width(0x20, 4), Address::from(0xffff_fff0));
    /// assert_eq!(addr.wrapping_sub_in_width(0x08, 8), Address::from(0x08));
    /// ```
    pub fn wrapping_sub_in_width(self, offset: u64, width_bytes: u64) -> Self
    {
        Address(self.0.wrapping_sub(offset) & width_mask(width_bytes))
    }

    /// Clear the low `bits` bits of this address
    ///
    /// Compact node layouts store color or balance information in the
    /// alignment bits of a parent pointer.
    pub const fn without_low_bits(self, bits: u32) -> Self
    {
        Address(self.0 & !((1u64 << bits) - 1))
    }
}

/// Mask selecting the bits of an integer `width_bytes` wide
///
/// Widths of 8 bytes or more select all 64 bits.
pub(crate) fn width_mask(width_bytes: u64) -> u64
{
    if width_bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (width_bytes * 8)) - 1
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_width_mask()
    {
        assert_eq!(width_mask(1), 0xff);
        assert_eq!(width_mask(4), 0xffff_ffff);
        assert_eq!(width_mask(8), u64::MAX);
    }

    #[test]
    fn test_without_low_bits()
    {
        assert_eq!(Address::from(0x1001).without_low_bits(1), Address::from(0x1000));
        assert_eq!(Address::from(0x1003).without_low_bits(2), Address::from(0x1000));
        assert_eq!(Address::from(0x1004).without_low_bits(2), Address::from(0x1004));
    }

    #[test]
    fn test_display_is_hex()
    {
        assert_eq!(Address::from(0x1000).to_string(), "0x1000");
        assert_eq!(Address::ZERO.to_string(), "0x0");
    }
}
