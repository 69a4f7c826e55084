use crate::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect<T> {
    pub origin: Vec2<T>,
    pub size: Vec2<T>,
}

impl<T: Default> Default for Rect<T> {
    fn default() -> Self {
        Self {
            origin: Vec2::zero(),
            size: Vec2::zero(),
        }
    }
}

impl<T> Rect<T> {
    pub fn new(origin: Vec2<T>, size: Vec2<T>) -> Self {
        Self { origin, size }
    }
}

impl<T: Default> Rect<T> {
    pub fn zero() -> Self {
        Self::default()
    }
}

impl<T: std::ops::Add<Output = T> + Copy> Rect<T> {
    pub fn max(&self) -> Vec2<T> {
        self.origin + self.size
    }
}

impl<T: std::ops::Add<Output = T> + PartialOrd + Copy> Rect<T> {
    pub fn contains_rect(&self, other: Rect<T>) -> bool {
        let self_max = self.max();
        let other_max = other.max();
        other.origin.x >= self.origin.x
            && other.origin.y >= self.origin.y
            && other_max.x <= self_max.x
            && other_max.y <= self_max.y
    }
}

impl Rect<usize> {
    /// Square of side `side` centered inside an area of `bounds`.
    ///
    /// The side is clamped to the smaller bounds dimension, so the result
    /// always lies inside `Rect::new(Vec2::zero(), bounds)`. Odd leftovers
    /// round the offset down.
    pub fn centered_square(bounds: Vec2<usize>, side: usize) -> Self {
        let side = side.min(bounds.min_element());
        Self {
            origin: Vec2::new((bounds.x - side) / 2, (bounds.y - side) / 2),
            size: Vec2::new(side, side),
        }
    }
}
