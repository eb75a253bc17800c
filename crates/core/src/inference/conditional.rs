use crate::types::Key;

/// Capability shared by every conditional a Bayes net or Bayes tree can hold.
///
/// A conditional is a density (or, symbolically, a dependency) over its
/// *frontal* variables given its *parent* variables. Both are stored as one
/// ordered key sequence: the first `nr_frontals()` keys are frontal, the rest
/// are parents.
pub trait Conditional: std::fmt::Debug {
    /// All keys, frontals first.
    fn keys(&self) -> &[Key];

    /// Number of leading keys that are frontal.
    fn nr_frontals(&self) -> usize;

    /// Structural and numeric equality within an absolute tolerance.
    fn equals(&self, other: &Self, tol: f64) -> bool
    where
        Self: Sized;

    fn frontals(&self) -> &[Key] {
        &self.keys()[..self.nr_frontals()]
    }

    fn parents(&self) -> &[Key] {
        &self.keys()[self.nr_frontals()..]
    }

    fn nr_parents(&self) -> usize {
        self.keys().len() - self.nr_frontals()
    }

    /// The first frontal key. Conditionals always have at least one.
    fn first_frontal(&self) -> Key {
        self.keys()[0]
    }
}

/// Check the invariants every conditional's key layout must satisfy:
/// a non-empty frontal prefix and no repeated keys.
pub(crate) fn check_key_layout(keys: &[Key], nr_frontals: usize) -> Result<(), String> {
    if nr_frontals == 0 {
        return Err("a conditional needs at least one frontal variable".to_string());
    }
    if nr_frontals > keys.len() {
        return Err(format!(
            "{} frontal variables requested but only {} keys given",
            nr_frontals,
            keys.len()
        ));
    }
    for (i, key) in keys.iter().enumerate() {
        if keys[..i].contains(key) {
            return Err(format!("variable {} appears twice", key));
        }
    }
    Ok(())
}
