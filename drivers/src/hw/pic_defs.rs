//! Legacy 8259 PIC (Programmable Interrupt Controller) definitions.

// ============================================================================
// Initialization Command Words
// ============================================================================

/// ICW1: initialization required
pub(crate) const ICW1_INIT: u8 = 0x10;
/// ICW1: ICW4 will follow
pub(crate) const ICW1_ICW4: u8 = 0x01;
/// ICW3 (master): slave attached on line 2
pub(crate) const ICW3_MASTER_SLAVE_ON_IRQ2: u8 = 0x04;
/// ICW3 (slave): cascade identity 2
pub(crate) const ICW3_SLAVE_CASCADE_ID: u8 = 0x02;
/// ICW4: 8086/88 mode
pub(crate) const ICW4_8086: u8 = 0x01;

// ============================================================================
// Masks
// ============================================================================

/// Every line masked
pub(crate) const PIC_MASK_ALL: u8 = 0xFF;
/// Every line unmasked
pub(crate) const PIC_MASK_NONE: u8 = 0x00;
/// Lines per chip
pub(crate) const PIC_LINES_PER_CHIP: u8 = 8;
