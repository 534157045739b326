use im::Vector;

use crate::ast::Value;
use crate::error::SorrelError;

/// Capability contract for ordered sequences. The analyzer and the
/// evaluator only ever go through these three operations, so any
/// variant that implements them can carry forms.
pub trait Seq {
    /// Number of elements. Fails for sequences that cannot be counted.
    fn count(&self) -> Result<usize, SorrelError>;

    /// First element, or `Nil` when the sequence is empty.
    fn first(&self) -> Result<Value, SorrelError>;

    /// Everything after the first element. Empty input yields an empty
    /// sequence.
    fn next(&self) -> Result<List, SorrelError>;
}

/// Ordered list of values. Backed by a persistent vector so `next`
/// shares structure instead of copying.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct List {
    items: Vector<Value>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    /// Append one value, returning the extended list.
    pub fn conj(&self, value: Value) -> List {
        let mut items = self.items.clone();
        items.push_back(value);
        List { items }
    }
}

impl Seq for List {
    fn count(&self) -> Result<usize, SorrelError> {
        Ok(self.items.len())
    }

    fn first(&self) -> Result<Value, SorrelError> {
        Ok(self.items.front().cloned().unwrap_or(Value::Nil))
    }

    fn next(&self) -> Result<List, SorrelError> {
        let mut items = self.items.clone();
        items.pop_front();
        Ok(List { items })
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = im::vector::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
