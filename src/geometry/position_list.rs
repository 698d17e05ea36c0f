use crate::geometry::vec_math::Vec3f;

/// One named point of a [`PositionList`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedPosition {
    pub id: u16,
    pub position: Vec3f,
}

/// Ordered list of named points, used to place mount points on a model.
///
/// Ids are not unique. All entries sharing an id, taken in list order, form a
/// path (a "range") along which [`PositionList::find_points`] distributes
/// placements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionList {
    points: Vec<NamedPosition>,
}

impl PositionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: u16, position: Vec3f) {
        self.points.push(NamedPosition { id, position });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedPosition> {
        self.points.iter()
    }

    /// First point carrying `id`.
    pub fn find(&self, id: u16) -> Option<Vec3f> {
        self.points.iter().find(|p| p.id == id).map(|p| p.position)
    }

    /// Number of points carrying `id`.
    pub fn count(&self, id: u16) -> usize {
        self.points.iter().filter(|p| p.id == id).count()
    }

    /// Returns `count` positions spread evenly along the range of `id`.
    ///
    /// The range is parameterised by point index, so with points at 10, 20
    /// and 30 a request for 2 yields the ends (10 and 30) and a request for 5
    /// yields 10, 15, 20, 25 and 30. A single request yields the middle of the
    /// range. Unknown ids and a zero count yield nothing.
    pub fn find_points(&self, id: u16, count: usize) -> Vec<Vec3f> {
        let range: Vec<Vec3f> = self
            .points
            .iter()
            .filter(|p| p.id == id)
            .map(|p| p.position)
            .collect();

        if range.is_empty() || count == 0 {
            return Vec::new();
        }

        let last = (range.len() - 1) as f32;
        if count == 1 {
            return vec![sample_range(&range, last * 0.5)];
        }

        let step = last / (count - 1) as f32;
        (0..count)
            .map(|i| sample_range(&range, step * i as f32))
            .collect()
    }
}

/// Linear interpolation along the range at fractional index `t`.
fn sample_range(range: &[Vec3f], t: f32) -> Vec3f {
    let last = range.len() - 1;
    let lower = (t.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let frac = (t - lower as f32).clamp(0.0, 1.0);
    range[lower].lerp(&range[upper], frac)
}

impl<'a> IntoIterator for &'a PositionList {
    type Item = &'a NamedPosition;
    type IntoIter = std::slice::Iter<'a, NamedPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
