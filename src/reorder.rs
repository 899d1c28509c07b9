//! Single-element move used by drag-and-drop reordering.

use thiserror::Error;

use crate::models::{Link, LinkId};

/// The moved or target link is not in the sequence the move was computed
/// against. The caller has to reload before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("link {missing} is no longer in the list; reload before reordering")]
pub struct StaleOrderingError {
    pub missing: LinkId,
}

/// Move `moved` to the position currently held by `target`.
///
/// The element at the moved index is removed and re-inserted at the target's
/// index in the shortened sequence, so dropping onto an item below places the
/// moved item after it and dropping onto an item above places it before.
/// `display_order` fields are left untouched.
pub fn move_link(
    sequence: &[Link],
    moved: LinkId,
    target: LinkId,
) -> Result<Vec<Link>, StaleOrderingError> {
    let from = position(sequence, moved)?;
    let to = position(sequence, target)?;

    let mut reordered = sequence.to_vec();
    if from != to {
        let link = reordered.remove(from);
        reordered.insert(to, link);
    }
    Ok(reordered)
}

/// Set every `display_order` to its index.
pub fn renumber(sequence: &mut [Link]) {
    for (index, link) in sequence.iter_mut().enumerate() {
        link.display_order = Some(index as i64);
    }
}

fn position(sequence: &[Link], id: LinkId) -> Result<usize, StaleOrderingError> {
    sequence
        .iter()
        .position(|link| link.id == id)
        .ok_or(StaleOrderingError { missing: id })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: LinkId = 1;
    const B: LinkId = 2;
    const C: LinkId = 3;
    const D: LinkId = 4;

    fn sequence(ids: &[LinkId]) -> Vec<Link> {
        ids.iter()
            .enumerate()
            .map(|(index, &id)| Link {
                id,
                owner_id: "owner".to_string(),
                title: format!("link {id}"),
                url: format!("https://example.com/{id}"),
                display_order: Some(index as i64),
                is_active: true,
                created_at: 0,
            })
            .collect()
    }

    fn ids(links: &[Link]) -> Vec<LinkId> {
        links.iter().map(|link| link.id).collect()
    }

    #[test]
    fn moving_up_inserts_before_target() {
        let links = sequence(&[A, B, C, D]);
        let moved = move_link(&links, C, A).unwrap();
        assert_eq!(ids(&moved), vec![C, A, B, D]);
    }

    #[test]
    fn moving_down_lands_after_target() {
        let links = sequence(&[A, B, C, D]);
        let moved = move_link(&links, A, C).unwrap();
        assert_eq!(ids(&moved), vec![B, C, A, D]);
    }

    #[test]
    fn move_onto_self_is_a_no_op() {
        let links = sequence(&[A, B, C, D]);
        assert_eq!(move_link(&links, B, B).unwrap(), links);
    }

    #[test]
    fn inverse_move_restores_order() {
        let links = sequence(&[A, B, C, D]);
        let moved = move_link(&links, B, D).unwrap();
        assert_eq!(ids(&moved), vec![A, C, D, B]);

        // B now sits where D was; moving it onto C (now at B's old index)
        // puts it back.
        let restored = move_link(&moved, B, C).unwrap();
        assert_eq!(ids(&restored), ids(&links));
    }

    #[test]
    fn result_is_a_permutation_for_every_pair() {
        let all = [A, B, C, D];
        let links = sequence(&all);
        for &moved in &all {
            for &target in &all {
                let result = move_link(&links, moved, target).unwrap();
                let mut sorted = ids(&result);
                sorted.sort_unstable();
                assert_eq!(sorted, all.to_vec(), "move {moved} onto {target}");
                let target_index = links.iter().position(|l| l.id == target).unwrap();
                assert_eq!(result[target_index].id, moved);
            }
        }
    }

    #[test]
    fn repeated_move_is_not_idempotent_unless_adjacent() {
        let links = sequence(&[A, B, C, D]);

        let once = move_link(&links, A, C).unwrap();
        let twice = move_link(&once, A, C).unwrap();
        assert_ne!(ids(&once), ids(&twice));

        // A and B adjacent: the second move lands A back where it started.
        let once = move_link(&links, A, B).unwrap();
        assert_eq!(ids(&once), vec![B, A, C, D]);
        let twice = move_link(&once, A, B).unwrap();
        assert_eq!(ids(&twice), vec![A, B, C, D]);
    }

    #[test]
    fn orders_are_untouched_until_renumbered() {
        let links = sequence(&[A, B, C]);
        let mut moved = move_link(&links, C, A).unwrap();
        assert_eq!(moved[0].display_order, Some(2));

        renumber(&mut moved);
        let orders: Vec<_> = moved.iter().map(|l| l.display_order).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn missing_target_is_stale() {
        let links = sequence(&[A, B, C]);
        assert_eq!(
            move_link(&links, A, D),
            Err(StaleOrderingError { missing: D })
        );
        assert_eq!(
            move_link(&links, D, A),
            Err(StaleOrderingError { missing: D })
        );
    }
}
