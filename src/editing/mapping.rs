//! Position mapping through committed changes

use smallvec::SmallVec;

/// Which side a position sticks to when text is inserted exactly at it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bias {
    /// Stay before inserted content
    Left,
    /// Move after inserted content
    #[default]
    Right,
}

/// Outcome of mapping a single position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position was inside a replaced range
    pub deleted: bool,
}

/// The effect of one replace step on document positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }

    /// A map that changes nothing
    pub fn identity() -> Self {
        Self::new(0, 0, 0)
    }

    /// Signed size change
    pub fn delta(&self) -> isize {
        self.new_size as isize - self.old_size as isize
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_result(pos, bias).pos
    }

    pub fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        let end = self.start + self.old_size;
        if pos < self.start || (self.old_size == 0 && self.new_size == 0) {
            return MapResult {
                pos,
                deleted: false,
            };
        }
        if pos > end {
            return MapResult {
                pos: (pos as isize + self.delta()) as usize,
                deleted: false,
            };
        }

        // Inside or on the edge of the replaced range
        let side = if self.old_size == 0 {
            bias
        } else if pos == self.start {
            Bias::Left
        } else if pos == end {
            Bias::Right
        } else {
            bias
        };
        let mapped = match side {
            Bias::Left => self.start,
            Bias::Right => self.start + self.new_size,
        };
        MapResult {
            pos: mapped,
            deleted: pos > self.start && pos < end,
        }
    }
}

/// A sequence of step maps applied in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: SmallVec<[StepMap; 4]>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_result(pos, bias).pos
    }

    pub fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, bias);
            deleted |= result.deleted;
            pos = result.pos;
        }
        MapResult { pos, deleted }
    }
}

impl From<StepMap> for Mapping {
    fn from(map: StepMap) -> Self {
        let mut mapping = Mapping::new();
        mapping.push(map);
        mapping
    }
}
