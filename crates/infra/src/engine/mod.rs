//! Place manager engines shipped with the workspace.

mod in_memory;

use geoplaces_places::Category;

pub use in_memory::InMemoryPlaceManagerEngine;

/// The category tree seeded by `initialize_categories`: top-level groups
/// with their children. Child ids are `<group>.<name>`.
pub fn default_categories() -> Vec<(Category, Vec<Category>)> {
    const TREE: &[(&str, &str, &[(&str, &str)])] = &[
        (
            "accommodation",
            "Accommodation",
            &[("hotel", "Hotel"), ("camping", "Camping")],
        ),
        (
            "eat-drink",
            "Eat & drink",
            &[("restaurant", "Restaurant"), ("cafe", "Café"), ("bar", "Bar")],
        ),
        (
            "leisure",
            "Leisure",
            &[("park", "Park"), ("museum", "Museum"), ("sauna", "Sauna")],
        ),
        (
            "transport",
            "Transport",
            &[("airport", "Airport"), ("station", "Train station")],
        ),
    ];

    TREE.iter()
        .map(|(group_id, group_name, children)| {
            let group = Category::new(*group_name).with_id(*group_id);
            let children = children
                .iter()
                .map(|(id, name)| Category::new(*name).with_id(format!("{group_id}.{id}")))
                .collect();
            (group, children)
        })
        .collect()
}
