//! Monitor geometry.
//!
//! The layout is read once from the OS at startup and cached; every monitor
//! becomes one panel window. Images are routed to the first panel whose
//! orientation matches theirs.

/// Landscape/portrait classification shared by panels and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Square counts as landscape.
    pub fn of(width: u32, height: u32) -> Self {
        if width >= height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Placement and size of one panel window, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub orientation: Orientation,
}

impl PanelGeometry {
    pub fn new(width: u32, height: u32, left: i32, top: i32) -> Self {
        Self {
            width,
            height,
            left,
            top,
            orientation: Orientation::of(width, height),
        }
    }
}

/// Index of the first panel matching `orientation`, falling back to panel 0.
pub fn panel_for_orientation(panels: &[PanelGeometry], orientation: Orientation) -> usize {
    panels
        .iter()
        .position(|p| p.orientation == orientation)
        .unwrap_or(0)
}

/// Enumerate monitors, ordered left to right. Always returns at least one
/// panel; when the OS query yields nothing a single 1920x1080 panel at the
/// origin is assumed.
pub fn detect_panels() -> Vec<PanelGeometry> {
    let mut panels = enumerate_monitors();
    if panels.is_empty() {
        panels.push(PanelGeometry::new(1920, 1080, 0, 0));
    }
    panels.sort_by_key(|p| (p.left, p.top));
    panels
}

#[cfg(windows)]
fn enumerate_monitors() -> Vec<PanelGeometry> {
    use winapi::shared::minwindef::{BOOL, LPARAM, TRUE};
    use winapi::shared::windef::{HDC, HMONITOR, LPRECT};
    use winapi::um::winuser::EnumDisplayMonitors;

    unsafe extern "system" fn collect(
        _monitor: HMONITOR,
        _hdc: HDC,
        rect: LPRECT,
        lparam: LPARAM,
    ) -> BOOL {
        let panels = &mut *(lparam as *mut Vec<PanelGeometry>);
        let r = *rect;
        let width = (r.right - r.left).max(0) as u32;
        let height = (r.bottom - r.top).max(0) as u32;
        if width > 0 && height > 0 {
            panels.push(PanelGeometry::new(width, height, r.left, r.top));
        }
        TRUE
    }

    let mut panels: Vec<PanelGeometry> = Vec::new();
    unsafe {
        EnumDisplayMonitors(
            std::ptr::null_mut(),
            std::ptr::null(),
            Some(collect),
            &mut panels as *mut Vec<PanelGeometry> as LPARAM,
        );
    }
    panels
}

#[cfg(not(windows))]
fn enumerate_monitors() -> Vec<PanelGeometry> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_classification() {
        assert_eq!(Orientation::of(1920, 1080), Orientation::Landscape);
        assert_eq!(Orientation::of(1080, 1920), Orientation::Portrait);
        assert_eq!(Orientation::of(1000, 1000), Orientation::Landscape);
    }

    #[test]
    fn routing_prefers_matching_orientation() {
        let panels = vec![
            PanelGeometry::new(1920, 1080, 0, 0),
            PanelGeometry::new(1080, 1920, 1920, 0),
        ];
        assert_eq!(panel_for_orientation(&panels, Orientation::Landscape), 0);
        assert_eq!(panel_for_orientation(&panels, Orientation::Portrait), 1);
    }

    #[test]
    fn routing_falls_back_to_first_panel() {
        let panels = vec![PanelGeometry::new(1920, 1080, 0, 0)];
        assert_eq!(panel_for_orientation(&panels, Orientation::Portrait), 0);
    }

    #[test]
    fn detect_panels_never_empty() {
        assert!(!detect_panels().is_empty());
    }
}
