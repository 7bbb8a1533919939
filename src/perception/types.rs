use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Geometric centre, rounded towards the top-left.
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x + self.width / 2) as i32,
            (self.y + self.height / 2) as i32,
        )
    }

    pub fn intersection_area(&self, other: &Region) -> u64 {
        let x1 = self.x.max(other.x) as u64;
        let y1 = self.y.max(other.y) as u64;
        let x2 = (self.x as u64 + self.width as u64).min(other.x as u64 + other.width as u64);
        let y2 = (self.y as u64 + self.height as u64).min(other.y as u64 + other.height as u64);
        x2.saturating_sub(x1) * y2.saturating_sub(y1)
    }

    /// Intersection divided by the smaller of the two areas.
    pub fn overlap_ratio(&self, other: &Region) -> f64 {
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f64 / smaller as f64
    }

    /// Clamp to an image of `img_w`×`img_h`; `None` if nothing is left.
    pub fn clamp_to(&self, img_w: u32, img_h: u32) -> Option<Region> {
        if self.x >= img_w || self.y >= img_h {
            return None;
        }
        let width = self.width.min(img_w - self.x);
        let height = self.height.min(img_h - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Region::new(self.x, self.y, width, height))
    }
}

/// Which detector proposed a candidate. Dropped after aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Color,
    Edge,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Position in the analysis pass that produced it; not stable across frames.
    pub id: usize,
    pub bounds: Region,
    pub text: String,
}

impl Element {
    pub fn center(&self) -> (i32, i32) {
        self.bounds.center()
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Case-insensitive substring match against the extracted text.
    pub fn text_contains(&self, needle: &str) -> bool {
        self.text.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Immutable result of one screen analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementTable {
    pub elements: Vec<Element>,
    pub resolution: (u32, u32),
    pub captured_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ElementTable {
    pub fn new(elements: Vec<Element>, resolution: (u32, u32)) -> Self {
        Self {
            elements,
            resolution,
            captured_at: Some(chrono::Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// First element (table order) whose text contains `needle`, ignoring case.
    pub fn find_by_text(&self, needle: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.text_contains(needle))
    }

    /// Text listing used by the CLI and logs.
    pub fn describe(&self) -> String {
        if self.elements.is_empty() {
            return "No UI elements detected.".to_string();
        }
        let mut lines = vec![format!(
            "Detected {} elements ({}x{}):",
            self.elements.len(),
            self.resolution.0,
            self.resolution.1
        )];
        for e in &self.elements {
            let b = e.bounds;
            let text_part = if e.has_text() {
                format!(" \"{}\"", e.text.replace('\n', " "))
            } else {
                String::new()
            };
            lines.push(format!(
                "  - [{}] ({}, {}, {}x{}){}",
                e.id, b.x, b.y, b.width, b.height, text_part
            ));
        }
        lines.join("\n")
    }
}
