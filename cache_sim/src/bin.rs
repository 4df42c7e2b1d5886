/// mask of the lowest `width` bits. saturates to all ones at 64.
#[inline]
pub const fn low_mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// logical right shift which yields 0 instead of overflowing.
#[inline]
pub const fn shr(value: u64, amount: u32) -> u64 {
    if amount >= u64::BITS {
        0
    } else {
        value >> amount
    }
}

/// `width` bits of `value` starting at bit `lsb`.
#[inline]
pub const fn extract(value: u64, lsb: u32, width: u32) -> u64 {
    shr(value, lsb) & low_mask(width)
}
