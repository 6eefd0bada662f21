use codeact::callgraph::{CallGraph, CallGraphOptions, CallGraphRequest, call_graph};
use codeact::cancel::CancellationToken;
use codeact::codemodel::CodeModel;
use codeact::csharp::CSharpCodeModel;
use codeact::workspace::{SessionHost, Snapshot, Workspace};
use std::collections::BTreeSet;
use std::sync::Arc;

const CHAIN: &str = "namespace App\n{\n    class Chain\n    {\n        public void A() { B(); C(); }\n        public void B() { C(); }\n        public void C() { A(); }\n        public void D() { }\n    }\n}\n";

const USER: &str = "namespace App\n{\n    class User\n    {\n        public void Go()\n        {\n            var chain = new Chain();\n            chain.C();\n        }\n    }\n}\n";

struct Fixture {
    host: Workspace,
    model: CSharpCodeModel,
}

impl Fixture {
    fn new() -> Self {
        let snapshot = Snapshot::builder()
            .document("App", "Chain.cs", CHAIN, None)
            .document("App", "User.cs", USER, None)
            .build();
        Self {
            host: Workspace::in_memory(snapshot),
            model: CSharpCodeModel::new(),
        }
    }

    fn id(&self, qualname: &str) -> String {
        let index = self.model.symbols(&self.snapshot()).unwrap();
        index.by_qualname(qualname)[0].id.clone()
    }

    fn graph(&self, root: &str, direction: &str, depth: usize) -> CallGraph {
        call_graph(
            &self.host,
            &self.model,
            &CallGraphRequest {
                symbol_id: self.id(root),
                direction: direction.to_string(),
                max_depth: Some(depth),
            },
            &CallGraphOptions { depth_limit: 4 },
            &CancellationToken::new(),
        )
        .unwrap()
    }

    fn name_of(&self, id: &str) -> String {
        let index = self.model.symbols(&self.snapshot()).unwrap();
        index
            .resolve(id)
            .map(|symbol| symbol.name.clone())
            .unwrap_or_default()
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.host.current().0
    }

    fn pairs(&self, graph: &CallGraph) -> BTreeSet<(String, String)> {
        graph
            .edges
            .iter()
            .map(|edge| (self.name_of(&edge.from), self.name_of(&edge.to)))
            .collect()
    }
}

fn pair(from: &str, to: &str) -> (String, String) {
    (from.to_string(), to.to_string())
}

#[test]
fn outgoing_depth_one_lists_direct_callees() {
    let fx = Fixture::new();
    let graph = fx.graph("App.Chain.A", "outgoing", 1);
    assert_eq!(
        fx.pairs(&graph),
        BTreeSet::from([pair("A", "B"), pair("A", "C")])
    );
    assert_eq!(graph.node_count, 3);
    assert_eq!(graph.edge_count, 2);
    assert!(graph.edges.iter().all(|edge| edge.snippet.is_some()));
}

#[test]
fn recursion_is_bounded_by_the_visited_set() {
    let fx = Fixture::new();
    let graph = fx.graph("App.Chain.A", "outgoing", 4);
    assert_eq!(
        fx.pairs(&graph),
        BTreeSet::from([pair("A", "B"), pair("A", "C"), pair("B", "C"), pair("C", "A")])
    );
    assert_eq!(graph.edge_count, 4);
}

#[test]
fn deeper_walks_only_add_edges() {
    let fx = Fixture::new();
    let mut previous: Vec<_> = Vec::new();
    for depth in 1..=4 {
        let graph = fx.graph("App.Chain.A", "outgoing", depth);
        for edge in &previous {
            assert!(graph.edges.contains(edge), "depth {depth} dropped an edge");
        }
        let keys: BTreeSet<_> = graph
            .edges
            .iter()
            .map(|edge| (&edge.from, &edge.to, &edge.location))
            .collect();
        assert_eq!(keys.len(), graph.edges.len());
        previous = graph.edges;
    }
}

#[test]
fn incoming_finds_callers_across_documents() {
    let fx = Fixture::new();
    let graph = fx.graph("App.Chain.C", "incoming", 1);
    assert_eq!(
        fx.pairs(&graph),
        BTreeSet::from([pair("A", "C"), pair("B", "C"), pair("Go", "C")])
    );
}

#[test]
fn both_is_the_union_of_two_walks() {
    let fx = Fixture::new();
    let incoming = fx.pairs(&fx.graph("App.Chain.B", "incoming", 2));
    let outgoing = fx.pairs(&fx.graph("App.Chain.B", "outgoing", 2));
    let both = fx.pairs(&fx.graph("App.Chain.B", "both", 2));
    let union: BTreeSet<_> = incoming.union(&outgoing).cloned().collect();
    assert_eq!(both, union);
}

#[test]
fn isolated_symbol_has_no_edges() {
    let fx = Fixture::new();
    let graph = fx.graph("App.Chain.D", "both", 4);
    assert!(graph.edges.is_empty());
    assert_eq!(graph.node_count, 1);
}

#[test]
fn depth_and_direction_are_validated() {
    let fx = Fixture::new();
    let request = |direction: &str, symbol_id: String, depth| CallGraphRequest {
        symbol_id,
        direction: direction.to_string(),
        max_depth: depth,
    };
    let options = CallGraphOptions { depth_limit: 4 };
    let cancel = CancellationToken::new();

    let clamped = call_graph(
        &fx.host,
        &fx.model,
        &request("outgoing", fx.id("App.Chain.A"), Some(40)),
        &options,
        &cancel,
    )
    .unwrap();
    assert_eq!(clamped.depth, 4);

    let err = call_graph(
        &fx.host,
        &fx.model,
        &request("up", fx.id("App.Chain.A"), None),
        &options,
        &cancel,
    )
    .unwrap_err();
    assert_eq!(err.code(), "invalid_input");

    let err = call_graph(
        &fx.host,
        &fx.model,
        &request("both", "not-an-id".to_string(), None),
        &options,
        &cancel,
    )
    .unwrap_err();
    assert_eq!(err.code(), "invalid_input");

    let err = call_graph(
        &fx.host,
        &fx.model,
        &request("both", "sym_0000000000000000".to_string(), None),
        &options,
        &cancel,
    )
    .unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[test]
fn cancelled_walk_unwinds() {
    let fx = Fixture::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = call_graph(
        &fx.host,
        &fx.model,
        &CallGraphRequest {
            symbol_id: fx.id("App.Chain.A"),
            direction: "outgoing".to_string(),
            max_depth: Some(2),
        },
        &CallGraphOptions { depth_limit: 4 },
        &cancel,
    )
    .unwrap_err();
    assert!(err.is_cancelled());
}
