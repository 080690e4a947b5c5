//! Natural ordering of node names.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares two names case-insensitively, treating runs of ASCII digits as
/// numbers, so `"Chapter 2"` sorts before `"chapter 10"`.
///
/// Digit runs with the same value but different zero padding (`"7"` vs
/// `"007"`) compare equal.
///
/// ```rust
/// use std::cmp::Ordering;
/// use arbornotes_core::natural_compare;
///
/// assert_eq!(natural_compare("item9", "Item10"), Ordering::Less);
/// assert_eq!(natural_compare("ABC", "abc"), Ordering::Equal);
/// ```
pub fn natural_compare(left: &str, right: &str) -> Ordering {
    let left = left.to_lowercase();
    let right = right.to_lowercase();
    let mut l = left.chars().peekable();
    let mut r = right.chars().peekable();

    loop {
        match (l.peek().copied(), r.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
                let ord = compare_digit_runs(&take_digits(&mut l), &take_digits(&mut r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(a), Some(b)) => {
                if a != b {
                    return a.cmp(&b);
                }
                l.next();
                r.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

// Compares by value without parsing, so arbitrarily long runs cannot overflow.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
