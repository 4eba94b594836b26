//! Transformation of concurrent operations.
//!
//! Given two operations produced against the same base document,
//! [`transform`] rebases each past the other so both application orders
//! converge:
//!
//! ```text
//! apply(result.left, apply(right, d)) == apply(result.right, apply(left, d))
//! ```
//!
//! Tie-breaks are fixed so every actor resolves the same conflict the same way:
//!
//! * insert vs insert at the same position: the right-hand operation, the one
//!   the log committed first, lands first;
//! * insert vs delete at the same position: the insertion precedes the deletion;
//! * an insertion strictly inside a concurrently deleted range survives and
//!   splits the deletion in two;
//! * overlapping deletions each drop the characters the other already removed;
//! * adding and removing the same chat message concurrently: the removal wins.


use crate::operation::Operation;
use crate::range::{Span, char_len, char_remove, char_slice};

/// Outcome of transforming two concurrent operation sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformResult {
	/// Left-hand operations rebased to apply after the right-hand ones.
	pub left: Vec<Operation>,
	/// Right-hand operations rebased to apply after the left-hand ones.
	pub right: Vec<Operation>,
}

impl TransformResult {
	fn of(left: Vec<Operation>, right: Vec<Operation>) -> Self {
		Self { left, right }
	}

	fn unchanged(left: &Operation, right: &Operation) -> Self {
		Self::of(non_empty(left), non_empty(right))
	}

	fn swap(self) -> Self {
		Self {
			left: self.right,
			right: self.left,
		}
	}
}

fn non_empty(op: &Operation) -> Vec<Operation> {
	if op.is_empty() { Vec::new() } else { vec![op.clone()] }
}

/// Transforms two concurrent operations against each other.
pub fn transform(left: &Operation, right: &Operation) -> TransformResult {
	if left.is_empty() || right.is_empty() {
		return TransformResult::unchanged(left, right);
	}

	match (left, right) {
		(Operation::Insert { position: lp, content: lc }, Operation::Insert { position: rp, content: rc }) => insert_insert(*lp, lc, *rp, rc),
		(Operation::Insert { position: ip, content: ic }, Operation::Delete { position: dp, content: dc }) => insert_delete(*ip, ic, *dp, dc),
		(Operation::Delete { position: dp, content: dc }, Operation::Insert { position: ip, content: ic }) => insert_delete(*ip, ic, *dp, dc).swap(),
		(Operation::Delete { .. }, Operation::Delete { .. }) => delete_delete(left, right),
		(Operation::Message { .. }, Operation::Message { .. }) => message_message(left, right),
		// Text and chat operations never address the same state.
		_ => TransformResult::unchanged(left, right),
	}
}

/// Transforms two concurrent operation sequences against each other.
///
/// `left` and `right` both start from the same base document; the result
/// rebases every operation of one sequence past all of the other.
pub fn transform_seq(left: &[Operation], right: &[Operation]) -> TransformResult {
	match (left, right) {
		([], _) => TransformResult::of(Vec::new(), right.to_vec()),
		(_, []) => TransformResult::of(left.to_vec(), Vec::new()),
		([single], [first, rest @ ..]) => {
			let head = transform(single, first);
			let tail = transform_seq(&head.left, rest);
			let mut rebased_right = head.right;
			rebased_right.extend(tail.right);
			TransformResult::of(tail.left, rebased_right)
		}
		([first, rest @ ..], _) => {
			let head = transform_seq(std::slice::from_ref(first), right);
			let tail = transform_seq(rest, &head.right);
			let mut rebased_left = head.left;
			rebased_left.extend(tail.left);
			TransformResult::of(rebased_left, tail.right)
		}
	}
}

fn insert_insert(lp: usize, lc: &str, rp: usize, rc: &str) -> TransformResult {
	let (left, right) = if lp < rp {
		(Operation::insert(lp, lc), Operation::insert(rp + char_len(lc), rc))
	} else {
		(Operation::insert(lp + char_len(rc), lc), Operation::insert(rp, rc))
	};
	TransformResult::of(vec![left], vec![right])
}

/// Insertion on the left, deletion on the right.
fn insert_delete(ip: usize, ic: &str, dp: usize, dc: &str) -> TransformResult {
	let deleted = Span::at(dp, char_len(dc));
	let inserted = char_len(ic);

	if ip <= deleted.start {
		return TransformResult::of(vec![Operation::insert(ip, ic)], vec![Operation::delete(dp + inserted, dc)]);
	}
	if ip >= deleted.end {
		return TransformResult::of(vec![Operation::insert(ip - deleted.len(), ic)], vec![Operation::delete(dp, dc)]);
	}

	let split = ip - dp;
	let before = char_slice(dc, 0, split);
	let after = char_slice(dc, split, deleted.len());
	TransformResult::of(
		vec![Operation::insert(dp, ic)],
		vec![Operation::delete(dp, before), Operation::delete(dp + inserted, after)],
	)
}

fn delete_delete(left: &Operation, right: &Operation) -> TransformResult {
	let (Some(l), Some(r)) = (left.deleted_span(), right.deleted_span()) else {
		return TransformResult::unchanged(left, right);
	};

	if l.end <= r.start {
		return TransformResult::of(non_empty(left), vec![shift_delete(right, r.start - l.len())]);
	}
	if r.end <= l.start {
		return TransformResult::of(vec![shift_delete(left, l.start - r.len())], non_empty(right));
	}

	let start = l.start.min(r.start);
	let rebased_left = strip_overlap(left, l, r, start);
	let rebased_right = strip_overlap(right, r, l, start);
	TransformResult::of(non_empty(&rebased_left), non_empty(&rebased_right))
}

fn shift_delete(op: &Operation, position: usize) -> Operation {
	match op {
		Operation::Delete { content, .. } => Operation::delete(position, content.clone()),
		other => other.clone(),
	}
}

/// Removes from deletion `op` (covering `own`) the characters `other` covers.
fn strip_overlap(op: &Operation, own: Span, other: Span, position: usize) -> Operation {
	let Operation::Delete { content, .. } = op else {
		return op.clone();
	};
	let remaining = match own.intersect(&other) {
		Some(overlap) => char_remove(content, overlap.start - own.start, overlap.end - own.start),
		None => content.clone(),
	};
	Operation::delete(position, remaining)
}

fn message_message(left: &Operation, right: &Operation) -> TransformResult {
	if left == right {
		return TransformResult::default();
	}
	if left.is_inverse_of(right) {
		let removal_is_left = matches!(left, Operation::Message { remove: true, .. });
		return if removal_is_left {
			TransformResult::of(vec![left.clone()], Vec::new())
		} else {
			TransformResult::of(Vec::new(), vec![right.clone()])
		};
	}
	TransformResult::unchanged(left, right)
}
