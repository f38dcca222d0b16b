//! Dependency-aware ordering of table creations
//!
//! Tables that are about to be created must appear after every table
//! they reference through a foreign key. The sorter builds the FK graph
//! over the to-be-created set, detects cycles with a three-color DFS,
//! and produces a stable post-order topological ordering. References to
//! tables outside the set are assumed to exist already and dropped from
//! the graph, as are self-references.

use pgdrift_core::TableDef;

/// Outcome of dependency sorting
#[derive(Debug, Clone)]
pub struct CreationOrder {
    /// Table names such that every FK target precedes its dependent
    /// (modulo cycles)
    pub order: Vec<String>,
    /// True when the FK graph contains at least one cycle; callers must
    /// then defer FK attachment to a second phase
    pub has_cycles: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Computes a creation order for the given tables
pub fn creation_order(tables: &[&TableDef]) -> CreationOrder {
    let folded: Vec<String> = tables.iter().map(|t| t.name.to_lowercase()).collect();
    let index_of = |name: &str| -> Option<usize> {
        let folded_name = name.to_lowercase();
        folded.iter().position(|n| *n == folded_name)
    };

    let mut adjacency: Vec<Vec<usize>> = Vec::with_capacity(tables.len());
    for (i, table) in tables.iter().enumerate() {
        let mut deps = Vec::new();
        for referenced in table.referenced_tables() {
            if let Some(j) = index_of(referenced)
                && j != i
                && !deps.contains(&j)
            {
                deps.push(j);
            }
        }
        adjacency.push(deps);
    }

    let mut state = SortState {
        adjacency,
        color: vec![Color::White; tables.len()],
        post_order: Vec::with_capacity(tables.len()),
        has_cycles: false,
    };

    for i in 0..tables.len() {
        if state.color[i] == Color::White {
            state.visit(i);
        }
    }

    CreationOrder {
        order: state
            .post_order
            .iter()
            .map(|&i| tables[i].name.clone())
            .collect(),
        has_cycles: state.has_cycles,
    }
}

struct SortState {
    adjacency: Vec<Vec<usize>>,
    color: Vec<Color>,
    post_order: Vec<usize>,
    has_cycles: bool,
}

impl SortState {
    fn visit(&mut self, node: usize) {
        self.color[node] = Color::Gray;
        let deps = self.adjacency[node].clone();
        for dep in deps {
            match self.color[dep] {
                Color::White => self.visit(dep),
                Color::Gray => self.has_cycles = true,
                Color::Black => {}
            }
        }
        self.color[node] = Color::Black;
        self.post_order.push(node);
    }
}
