/// Board-support seam. Implementations own hardware bring-up and report
/// success as a plain boolean, matching the vendor library contract; the
/// diagnosis behind a `false` stays inside the implementation.
pub trait Board {
    /// Library version string, as printed in the inclusion banner.
    fn version(&self) -> &str;

    /// One-shot hardware bring-up: identity validation, persisted hardware
    /// version check, power management. `false` means the board must not be
    /// operated.
    fn begin(&mut self) -> bool;
}
