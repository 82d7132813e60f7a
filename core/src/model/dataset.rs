use serde::{Deserialize, Serialize};

/// Where the dataset currently shown by a tool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Simulated,
    Uploaded,
}

/// Ordered collection of observations produced by one simulate or upload action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DataSet<P> {
    points: Vec<P>,
}

impl<P> DataSet<P> {
    pub fn new(points: Vec<P>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<P> {
        self.points
    }
}

impl<P> Default for DataSet<P> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

impl<P> FromIterator<P> for DataSet<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a, P> IntoIterator for &'a DataSet<P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
