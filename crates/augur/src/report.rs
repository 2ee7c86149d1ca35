//! Report rendering: grouped, deterministic textual output per program
//! point.

use std::fmt::Write;

use crate::{invariants::Invariant, point::ProgramPoint, value::Value};

/// Renders one program point's report section.
///
/// Layout: header, equality groups, singleton invariants of canonical
/// variables, pairwise invariants with the pure `!=` relations collected at
/// the end, then ternary invariants. Unconstrained invariants are
/// suppressed unless `print_unconstrained` is set.
pub(crate) fn render_point(point: &ProgramPoint, print_unconstrained: bool, out: &mut String) {
    let vars = &point.vars;
    let _ = writeln!(out, "{}", "=".repeat(75));
    let _ = writeln!(out, "{} {} samples", point.name, point.samples);

    // Equality groups first: every canonical variable with a non-empty
    // class, annotated with the constant when the class is exact.
    for vi in vars {
        if !vi.is_canonical() || vi.equal_to.is_empty() {
            continue;
        }
        let mut line = vi.name.clone();
        for &other in &vi.equal_to {
            line.push_str(" = ");
            line.push_str(&vars[other].name);
        }
        if let Some(value) = exact_value(vi.invariant.as_ref()) {
            let _ = write!(line, " = {value}");
        }
        let _ = writeln!(out, "{line}");
    }

    // Singleton invariants.
    for vi in vars {
        if !vi.is_canonical() {
            continue;
        }
        let Some(inv) = vi.invariant.as_ref() else { continue };
        if inv.is_exact() && !vi.equal_to.is_empty() {
            // Already shown with its equality group.
            continue;
        }
        let rendered = inv.render(&[&vi.name]);
        if rendered.constrained || print_unconstrained {
            let _ = writeln!(out, "  {}", rendered.text);
        }
    }

    // Pairwise invariants; bare disequalities read better collected last.
    let mut nonequal: Vec<String> = Vec::new();
    for vi in vars {
        if !vi.is_canonical() {
            continue;
        }
        for (&other, inv) in &vi.pair_invariants {
            if !vars[other].is_canonical() {
                continue;
            }
            let rendered = inv.render(&[&vi.name, &vars[other].name]);
            if !rendered.constrained && !print_unconstrained {
                continue;
            }
            if rendered.text.contains(" != ") {
                nonequal.push(rendered.text);
            } else {
                let _ = writeln!(out, "    {}", rendered.text);
            }
        }
    }
    for text in nonequal {
        let _ = writeln!(out, "     {text}");
    }

    // Ternary invariants come last.
    for vi in vars {
        if !vi.is_canonical() {
            continue;
        }
        for (&(i2, i3), inv) in &vi.triple_invariants {
            if !vars[i2].is_canonical() || !vars[i3].is_canonical() {
                continue;
            }
            let rendered = inv.render(&[&vi.name, &vars[i2].name, &vars[i3].name]);
            if rendered.constrained || print_unconstrained {
                let _ = writeln!(out, "      {}", rendered.text);
            }
        }
    }
}

/// The constant of an exact invariant, for equality-group annotation.
fn exact_value(inv: Option<&Invariant>) -> Option<&Value> {
    match inv? {
        Invariant::Scalar(scalar) => scalar.exact_value(),
        Invariant::Sequence(seq) if seq.base.is_exact() => seq.min.as_ref(),
        _ => None,
    }
}
