#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use interactome::filter::{Combinator, FieldFilter};
use interactome::generator::{DataGenerator, Shape};
use interactome::selection::Priority;
use interactome::visible::UnconnectedMode;
use interactome::{Dataset, Session, SessionOptions};
use proptest::prelude::*;
use rustc_hash::FxHashSet;

const TISSUES: [&str; 6] = ["striatum", "cortex", "cerebellum", "brain (whole)", "liver", "muscle"];

fn generated(seed: u64, genes: usize) -> Arc<Dataset> {
    let shape = Shape {
        genes,
        studies: 12,
        rows_per_gene: 2,
        edges_per_gene: 3,
        unreported: 0.2,
    };
    let mut generator = DataGenerator::new(seed);
    let nodes = generator.nodes(common::schema(), &shape);
    let edges = generator.edges(&shape);
    Arc::new(Dataset::new(nodes, edges).expect("generated dataset"))
}

fn combinator() -> impl Strategy<Value = Combinator> {
    prop_oneof![
        Just(Combinator::Or),
        Just(Combinator::And),
        Just(Combinator::Not)
    ]
}

fn tissue_filter() -> impl Strategy<Value = FieldFilter> {
    (proptest::sample::subsequence(TISSUES.to_vec(), 1..=3), combinator())
        .prop_map(|(values, combinator)| FieldFilter::new(values, combinator))
}

/// Filter, query and cutoff applied on top of a session's defaults.
#[derive(Debug, Clone)]
struct ViewInputs {
    filter: Option<FieldFilter>,
    query: Vec<u64>,
    ppi_cutoff: u32,
}

impl ViewInputs {
    fn apply(&self, session: &mut Session) {
        if let Some(filter) = &self.filter {
            session.set_filter("tissue", filter.clone()).expect("filter");
        }
        let query: Vec<String> = self.query.iter().map(u64::to_string).collect();
        session.set_query(query.join("\n"));
        session.set_ppi_cutoff(self.ppi_cutoff);
    }
}

// Generated gene IDs start at 1000; a few query IDs fall outside the table.
fn view_inputs() -> impl Strategy<Value = ViewInputs> {
    (
        proptest::option::of(tissue_filter()),
        proptest::collection::vec(995u64..1045, 0..8),
        0u32..4,
    )
        .prop_map(|(filter, query, ppi_cutoff)| ViewInputs {
            filter,
            query,
            ppi_cutoff,
        })
}

fn mode() -> impl Strategy<Value = UnconnectedMode> {
    prop_oneof![Just(UnconnectedMode::Hide), Just(UnconnectedMode::Show)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn reapplying_a_filter_changes_nothing(seed in 0u64..500, filter in tissue_filter()) {
        let mut session = Session::new(generated(seed, 40), SessionOptions::default());
        session.set_filter("tissue", filter.clone()).expect("filter");
        let filtered = Arc::clone(session.filtered());
        let report = session.set_filter("tissue", filter).expect("filter");
        prop_assert!(report.is_empty());
        prop_assert!(Arc::ptr_eq(&filtered, session.filtered()));
    }

    #[test]
    fn filtered_rows_are_a_subset_of_the_table(seed in 0u64..500, filter in tissue_filter()) {
        let dataset = generated(seed, 40);
        let mut session = Session::new(Arc::clone(&dataset), SessionOptions::default());
        session.set_filter("tissue", filter).expect("filter");
        let all = dataset.nodes().gene_ids();
        prop_assert!(session.filtered().gene_ids().is_subset(&all));
        prop_assert!(session.filtered().len() <= dataset.nodes().len());
    }

    #[test]
    fn raising_the_threshold_never_adds_edges(
        seed in 0u64..500,
        low in 0.0f64..1.0,
        delta in 0.0f64..0.5,
    ) {
        let mut session = Session::new(generated(seed, 40), SessionOptions::default());
        session.set_score_threshold(low);
        let before: FxHashSet<usize> = session.selected_edges().iter().map(|e| e.edge).collect();
        session.set_score_threshold(low + delta);
        let after: FxHashSet<usize> = session.selected_edges().iter().map(|e| e.edge).collect();
        prop_assert!(after.is_subset(&before));
        prop_assert!(session.selected_edges().iter().all(|e| e.score >= low + delta));
    }

    #[test]
    fn visible_edges_join_visible_nodes(
        seed in 0u64..500,
        view in view_inputs(),
        max_nodes in 0usize..30,
        unconnected in mode(),
        priority in prop_oneof![Just(Priority::Total), Just(Priority::Filtered)],
    ) {
        let options = SessionOptions {
            score_threshold: 0.3,
            max_nodes,
            unconnected,
            priority,
            ..SessionOptions::default()
        };
        let mut session = Session::new(generated(seed, 40), options);
        view.apply(&mut session);

        let selected: FxHashSet<_> = session.selected_nodes().iter().map(|n| n.gene_id).collect();
        for edge in session.selected_edges().iter() {
            prop_assert!(selected.contains(&edge.source));
            prop_assert!(selected.contains(&edge.target));
        }

        let visible = session.visible();
        let genes: FxHashSet<_> = visible.nodes.iter().map(|n| n.node.gene_id).collect();
        prop_assert_eq!(genes.len(), visible.nodes.len());
        prop_assert!(genes.is_subset(&selected));
        for edge in &visible.edges {
            prop_assert!(genes.contains(&edge.edge.source));
            prop_assert!(genes.contains(&edge.edge.target));
        }
        let degree_sum: u32 = visible.nodes.iter().map(|n| n.connectivity).sum();
        prop_assert_eq!(degree_sum as usize, visible.edges.len() * 2);
    }

    #[test]
    fn hiding_unconnected_nodes_overshoots_by_at_most_one(
        seed in 0u64..500,
        view in view_inputs(),
        max_nodes in 1usize..30,
    ) {
        let options = SessionOptions {
            score_threshold: 0.3,
            max_nodes,
            unconnected: UnconnectedMode::Hide,
            ..SessionOptions::default()
        };
        let mut session = Session::new(generated(seed, 40), options);
        view.apply(&mut session);
        let visible = session.visible();
        prop_assert!(visible.nodes.len() <= max_nodes + 1);
        prop_assert_eq!(visible.unconnected(), 0);
    }

    #[test]
    fn showing_unconnected_nodes_takes_the_cap(seed in 0u64..500, max_nodes in 0usize..60) {
        let options = SessionOptions {
            max_nodes,
            unconnected: UnconnectedMode::Show,
            ..SessionOptions::default()
        };
        let session = Session::new(generated(seed, 40), options);
        let expected = max_nodes.min(session.selected_nodes().len());
        prop_assert_eq!(session.visible().nodes.len(), expected);

        let mut previous = u32::MAX;
        for node in &session.visible().nodes {
            prop_assert!(node.node.ppi_sum_total <= previous);
            previous = node.node.ppi_sum_total;
        }
    }

    #[test]
    fn ppi_cutoff_only_removes_genes(seed in 0u64..500, cutoff in 0u32..6) {
        let mut session = Session::new(generated(seed, 40), SessionOptions::default());
        let all: FxHashSet<_> = session.selected_nodes().iter().map(|n| n.gene_id).collect();
        session.set_ppi_cutoff(cutoff);
        for node in session.selected_nodes().iter() {
            prop_assert!(all.contains(&node.gene_id));
            prop_assert!(node.ppi_sum_total >= cutoff);
            prop_assert!(node.ppi_sum_filtered <= node.ppi_sum_total);
        }
    }
}
