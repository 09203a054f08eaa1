/// Limits that keep a single type-check pass bounded
///
/// Both limits are performance safeguards rather than semantic rules: no
/// well-formed expression written by a person comes near them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum `|options(a)| × |options(b)|` when unifying "or" types
    /// Real usage: ~4 combinations, Limit: 100
    pub max_type_option_product: usize,

    /// Maximum expression nesting depth visited by the checker
    /// Real usage: ~5 levels, Limit: 100 (20x)
    pub max_expression_depth: usize,
}

/// Default cap on pairwise "or" type unifications.
pub const MAX_TYPE_OPTION_PRODUCT: usize = 100;

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_type_option_product: MAX_TYPE_OPTION_PRODUCT,
            max_expression_depth: 100,
        }
    }
}

impl ResourceLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_type_option_product(mut self, limit: usize) -> Self {
        self.max_type_option_product = limit;
        self
    }

    pub fn with_max_expression_depth(mut self, limit: usize) -> Self {
        self.max_expression_depth = limit;
        self
    }
}
