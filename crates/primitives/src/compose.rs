use crate::operation::Operation;
use crate::range::{char_len, char_remove, char_slice, char_splice};

/// Composes two sequential operations from the same actor into one.
///
/// `second` must have been produced against the document `first` leaves
/// behind. Returns `None` when the pair has no single-operation equivalent;
/// the result may be an empty operation when the pair cancels out.
pub fn compose(first: &Operation, second: &Operation) -> Option<Operation> {
	if first.is_empty() {
		return Some(second.clone());
	}
	if second.is_empty() {
		return Some(first.clone());
	}

	match (first, second) {
		(Operation::Insert { position: p1, content: c1 }, Operation::Insert { position: p2, content: c2 }) => {
			let offset = p2.checked_sub(*p1).filter(|offset| *offset <= char_len(c1))?;
			Some(Operation::insert(*p1, char_splice(c1, offset, c2)))
		}
		(Operation::Delete { position: p1, content: c1 }, Operation::Delete { position: p2, content: c2 }) => {
			if p2 == p1 {
				Some(Operation::delete(*p1, format!("{c1}{c2}")))
			} else if *p2 + char_len(c2) == *p1 {
				Some(Operation::delete(*p2, format!("{c2}{c1}")))
			} else {
				None
			}
		}
		(Operation::Insert { position: p1, content: c1 }, Operation::Delete { position: p2, content: c2 }) => {
			let offset = p2.checked_sub(*p1)?;
			let end = offset + char_len(c2);
			if end > char_len(c1) || char_slice(c1, offset, end) != *c2 {
				return None;
			}
			Some(Operation::insert(*p1, char_remove(c1, offset, end)))
		}
		(Operation::Delete { position: p1, content: c1 }, Operation::Insert { position: p2, content: c2 }) => {
			(p1 == p2 && c1 == c2).then(|| Operation::insert(*p1, String::new()))
		}
		(Operation::Message { .. }, Operation::Message { .. }) if first == second => Some(first.clone()),
		_ => None,
	}
}

/// Folds a sequence of operations into an equivalent, shorter one.
///
/// Adjacent composable operations merge and empty results are dropped.
/// Chat add/remove pairs are never cancelled: on a set their net effect
/// depends on whether the message was present beforehand.
pub fn squash<I>(ops: I) -> Vec<Operation>
where
	I: IntoIterator<Item = Operation>,
{
	let mut out: Vec<Operation> = Vec::new();
	for op in ops {
		if op.is_empty() {
			continue;
		}
		match out.pop() {
			None => out.push(op),
			Some(prev) => match compose(&prev, &op) {
				Some(merged) => {
					if !merged.is_empty() {
						out.push(merged);
					}
				}
				None => {
					out.push(prev);
					out.push(op);
				}
			},
		}
	}
	out
}

/// Returns the operations undoing `ops`, in application order.
pub fn invert_seq(ops: &[Operation]) -> Vec<Operation> {
	ops.iter().rev().map(Operation::invert).collect()
}
