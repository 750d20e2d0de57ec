/// Knobs of instruction selection.
#[derive(Clone, Debug)]
pub struct LowerFlags {
    /// Switches with fewer cases become a chain of equality branches.
    pub sequential_switch_limit: usize,
    pub use_table_ranges: bool,
    /// Table switches with at least this many cases per range are lowered as
    /// range tests, sparser ones as a jump table.
    pub range_tests_switch_density: usize,
    pub gen_loop_safepoints: bool,
    pub gen_explicit_null_checks: bool,
    pub gen_explicit_div_zero_checks: bool,
    pub trace_block_entry: bool,
    pub max_variables: u32,
    /// Methods whose LIR is printed, see `method_pattern_match`.
    pub print_lir: Option<String>,
}

impl Default for LowerFlags {
    fn default() -> LowerFlags {
        LowerFlags {
            sequential_switch_limit: 4,
            use_table_ranges: true,
            range_tests_switch_density: 5,
            gen_loop_safepoints: true,
            gen_explicit_null_checks: true,
            gen_explicit_div_zero_checks: false,
            trace_block_entry: false,
            max_variables: 1 << 20,
            print_lir: None,
        }
    }
}

impl LowerFlags {
    pub fn should_print_lir(&self, method_name: &str) -> bool {
        match self.print_lir {
            Some(ref pattern) => method_pattern_match(method_name, pattern),
            None => false,
        }
    }
}

/// `pattern` is `all`, `*` or a `;`-separated list of name suffixes.
pub fn method_pattern_match(name: &str, pattern: &str) -> bool {
    if pattern == "all" || pattern == "*" {
        return true;
    }

    pattern
        .split(';')
        .any(|part| !part.is_empty() && name.ends_with(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_match() {
        assert!(method_pattern_match("Foo.bar", "all"));
        assert!(method_pattern_match("Foo.bar", "*"));
        assert!(method_pattern_match("Foo.bar", "baz;bar"));
        assert!(method_pattern_match("Foo.bar", "Foo.bar"));
        assert!(!method_pattern_match("Foo.bar", "Foo"));
        assert!(!method_pattern_match("Foo.bar", ";"));
    }

    #[test]
    fn test_print_lir_needs_pattern() {
        let mut flags = LowerFlags::default();
        assert!(!flags.should_print_lir("Foo.bar"));

        flags.print_lir = Some("bar".into());
        assert!(flags.should_print_lir("Foo.bar"));
    }
}
