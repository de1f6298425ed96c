//! Section hierarchy assembly

use super::ChunkForest;

/// Attaches every non-heading chunk to the nearest preceding heading
///
/// Chunks before the first heading stay roots, as do all headings, so the
/// result is a forest with one tree per heading.
pub fn build_hierarchy(forest: &mut ChunkForest) {
    let mut open_section = None;

    for id in forest.ids() {
        let Some(chunk) = forest.get(id) else { continue };
        if chunk.is_heading() {
            open_section = Some(id);
        } else if let Some(section) = open_section {
            forest.attach(section, id);
        }
    }
}
