use crate::program::Expression;

/// Symmetry breaking prevents certain applications from being enumerated.
///
/// A rule `(f, i, a)` means that enumeration will not yield an application of the primitive named
/// `f` whose `i`th argument is headed by the primitive named `a`. A rule with no index applies to
/// every argument position. Rules are matched by primitive name; inventions and variables are
/// never pruned.
///
/// The default is [`classic`].
///
/// # Examples
///
/// ```
/// use polytype::{ptp, tp};
/// use ecgrammar::grammar::{Grammar, SymmetryBreaking};
///
/// let mut symmetry = SymmetryBreaking::none();
/// // disallow (+ 0 _) and (+ _ 0)
/// symmetry.forbid("+", None, "0");
/// // disallow (+ (+ ..) _), so effort isn't wasted with (+ _ (+ ..))
/// symmetry.forbid("+", Some(0), "+");
///
/// let g = Grammar::uniform(vec![
///     ("0", ptp!(int)),
///     ("1", ptp!(int)),
///     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
/// ])
/// .with_symmetry(symmetry);
///
/// let plus = g.parse("+").unwrap();
/// let x = g.parse("(+ 1 1)").unwrap();
/// assert!(g.symmetry().violates(&plus, 0, &x));
/// assert!(!g.symmetry().violates(&plus, 1, &x));
/// ```
///
/// [`classic`]: #method.classic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetryBreaking {
    /// Kept sorted for binary search.
    rules: Vec<(String, Option<usize>, String)>,
}
impl SymmetryBreaking {
    /// No pruning at all.
    pub fn none() -> Self {
        SymmetryBreaking { rules: Vec::new() }
    }

    /// Pruning for list and arithmetic identities:
    ///
    /// - `car`, `cdr` and `empty?` of a `cons` or `empty`,
    /// - `+` with `0` as either argument, or `+` as its second argument,
    /// - `-` with `0` as its second argument,
    /// - `zero?` of `0` or `1`.
    pub fn classic() -> Self {
        let mut symmetry = SymmetryBreaking::none();
        for f in &["car", "cdr", "empty?"] {
            symmetry.forbid(f, None, "cons");
            symmetry.forbid(f, None, "empty");
        }
        symmetry.forbid("+", None, "0");
        symmetry.forbid("+", Some(1), "+");
        symmetry.forbid("-", Some(1), "0");
        symmetry.forbid("zero?", None, "0");
        symmetry.forbid("zero?", None, "1");
        symmetry
    }

    pub fn forbid(&mut self, f: &str, index: Option<usize>, arg: &str) {
        let rule = (String::from(f), index, String::from(arg));
        if let Err(i) = self.rules.binary_search(&rule) {
            self.rules.insert(i, rule)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `x` as the `index`th argument of `f` is redundant.
    pub fn violates(&self, f: &Expression, index: usize, x: &Expression) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let (head, _) = x.application_parse();
        match (f, head) {
            (Expression::Primitive(f), Expression::Primitive(x)) => {
                self.contains(&f.name, None, &x.name) || self.contains(&f.name, Some(index), &x.name)
            }
            _ => false,
        }
    }

    fn contains(&self, f: &str, index: Option<usize>, x: &str) -> bool {
        self.rules
            .binary_search_by(|(rf, ri, rx)| (rf.as_str(), *ri, rx.as_str()).cmp(&(f, index, x)))
            .is_ok()
    }
}
impl Default for SymmetryBreaking {
    fn default() -> Self {
        SymmetryBreaking::classic()
    }
}
