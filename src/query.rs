use crate::types::RowValues;

/// A SQL string and its bound parameters bundled together.
///
/// The Nth `$N` placeholder in `query` binds `params[N - 1]`:
/// ```rust
/// use pg_crud_accessor::prelude::*;
///
/// let qp = QueryAndParams::new(
///     "INSERT INTO public.t (id,name) VALUES ($1,$2)",
///     vec![RowValues::Int(1), RowValues::Text("alice".into())],
/// );
/// assert_eq!(qp.placeholder_count(), qp.params.len());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    /// Create a new `QueryAndParams` with the given query string and parameters
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    /// Create a new `QueryAndParams` with no parameters
    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }

    /// Highest `$N` placeholder number that appears in the query text.
    ///
    /// The scan does not skip string literals or comments, so it only describes statements
    /// without a literal `$`, such as the ones the builders produce.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        let bytes = self.query.as_bytes();
        let mut max = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start {
                    if let Ok(n) = self.query[start..end].parse::<usize>() {
                        max = max.max(n);
                    }
                }
                i = end.max(i + 1);
            } else {
                i += 1;
            }
        }
        max
    }
}

/// `$N` for a 1-based parameter position.
pub(crate) fn placeholder(position: usize) -> String {
    format!("${position}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_highest_placeholder() {
        let qp = QueryAndParams::new("UPDATE t SET a=$2,b=$3 WHERE id=$1", vec![]);
        assert_eq!(qp.placeholder_count(), 3);
        assert_eq!(QueryAndParams::new_without_params("SELECT 1").placeholder_count(), 0);
        assert_eq!(QueryAndParams::new_without_params("SELECT $12").placeholder_count(), 12);
    }
}
