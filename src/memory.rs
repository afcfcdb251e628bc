use ndarray::Array2;

/// Buffer handed back to an allocation site so the next cycle can reuse it.
#[derive(Clone, Debug)]
pub enum Array2Recycle<T> {
    Empty,
    Recycle(Array2<T>),
}

impl<T> Array2Recycle<T>
where
    T: num::Zero + Clone,
{
    /// Returns the recycled array if it has the required shape, a zeroed one otherwise.
    /// A reused array keeps its previous content.
    pub fn get(self, required_dim: (usize, usize)) -> Array2<T> {
        match self {
            Self::Empty => Array2::<T>::zeros(required_dim),
            Self::Recycle(current) => {
                if current.dim() != required_dim {
                    Array2::<T>::zeros(required_dim)
                } else {
                    current
                }
            }
        }
    }
}

impl<T> From<Option<Array2<T>>> for Array2Recycle<T> {
    fn from(array: Option<Array2<T>>) -> Self {
        match array {
            Some(array) => Self::Recycle(array),
            None => Self::Empty,
        }
    }
}
