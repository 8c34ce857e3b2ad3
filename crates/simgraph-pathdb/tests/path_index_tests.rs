//! Path index construction over small meshes.

use simgraph_graph::{create_box, GraphSet, Set, SetRef};
use simgraph_pathdb::{
    PathError, PathExpression, PathIndex, PathIndexBuilder, PathIndexConfig, QuantifiedVar,
    SegmentedPathIndex, Stencil, Var,
};

/// `V = {v0..v4}`, `E = {(v0,v1), (v1,v2), (v2,v3), (v3,v4)}`.
fn chain_builder() -> (PathIndexBuilder, SetRef, SetRef) {
    chain_builder_with(PathIndexConfig::default())
}

fn chain_builder_with(config: PathIndexConfig) -> (PathIndexBuilder, SetRef, SetRef) {
    let mut v = Set::new("V");
    let mut e = Set::edge_set("E", &[&v, &v]);
    create_box(&mut v, &mut e, 5, 1, 1).unwrap();
    let (v, e) = (v.into_ref(), e.into_ref());

    let mut builder = PathIndexBuilder::with_config(config);
    for name in ["v", "vi", "vj"] {
        builder.bind(name, v.clone()).unwrap();
    }
    for name in ["e", "ei", "ej"] {
        builder.bind(name, e.clone()).unwrap();
    }
    (builder, v, e)
}

fn rows(index: &PathIndex) -> Vec<Vec<u32>> {
    index.iter().map(|e| index.neighbors(e).collect()).collect()
}

fn ev() -> PathExpression {
    PathExpression::ev(Var::new("e"), Var::new("v"))
}

fn ve() -> PathExpression {
    PathExpression::ve(Var::new("v"), Var::new("e"))
}

fn vev() -> PathExpression {
    PathExpression::vev(Var::new("vi"), Var::new("e"), Var::new("vj")).unwrap()
}

// ============================================================================
// Links
// ============================================================================

#[test]
fn test_ev_over_homogeneous_edges_is_zero_copy() {
    let (mut builder, _v, e) = chain_builder();
    let index = builder.build_segmented(&ev(), 0).unwrap();

    let view = index.as_set_endpoint().expect("zero-copy endpoint view");
    assert_eq!(view.edge_set().id(), e.id());
    assert!(index.as_segmented().is_none());
    assert_eq!(index.num_elements(), 4);
    assert_eq!(index.num_neighbors(), 8);
    assert_eq!(index.row_width(), Some(2));
    assert_eq!(rows(&index), [[0, 1], [1, 2], [2, 3], [3, 4]]);
}

#[test]
fn test_ev_copies_when_zero_copy_is_disabled() {
    let config = PathIndexConfig {
        zero_copy_endpoints: false,
        ..PathIndexConfig::default()
    };
    let (mut builder, _v, _e) = chain_builder_with(config);
    let index = builder.build_segmented(&ev(), 0).unwrap();

    let seg = index.as_segmented().expect("segmented layout");
    assert_eq!(seg.coord_data(), &[0, 2, 4, 6, 8]);
    assert_eq!(seg.sink_data(), &[0, 1, 1, 2, 2, 3, 3, 4]);
    assert_eq!(index.row_width(), Some(2));
    assert_eq!(rows(&index), [[0, 1], [1, 2], [2, 3], [3, 4]]);
}

#[test]
fn test_ve_lists_incident_edges() {
    let (mut builder, _v, _e) = chain_builder();
    let index = builder.build_segmented(&ve(), 0).unwrap();

    let seg = index.as_segmented().expect("segmented layout");
    assert_eq!(seg.coord_data(), &[0, 1, 3, 5, 7, 8]);
    assert_eq!(seg.sink_data(), &[0, 0, 1, 1, 2, 2, 3, 3]);
    assert_eq!(index.row_width(), None);
    assert_eq!(index.num_neighbors_of(0), 1);
    assert_eq!(index.num_neighbors_of(2), 2);
}

#[test]
fn test_source_endpoint_one_inverts_links() {
    let (mut builder, _v, _e) = chain_builder();
    let ev_inverse = builder.build_segmented(&ev(), 1).unwrap();
    let ve_forward = builder.build_segmented(&ve(), 0).unwrap();
    assert_eq!(rows(&ev_inverse), rows(&ve_forward));

    let ve_inverse = builder.build_segmented(&ve(), 1).unwrap();
    assert_eq!(rows(&ve_inverse), [[0, 1], [1, 2], [2, 3], [3, 4]]);
}

#[test]
fn test_heterogeneous_edges_copy_matching_positions() {
    let mut points = Set::new("points");
    let mut cells = Set::new("cells");
    let p: Vec<_> = (0..3).map(|_| points.add().unwrap()).collect();
    let c: Vec<_> = (0..2).map(|_| cells.add().unwrap()).collect();
    let mut links = Set::edge_set("links", &[&points, &cells]);
    links.add_edge(&[p[2], c[0]]).unwrap();
    links.add_edge(&[p[0], c[1]]).unwrap();
    links.add_edge(&[p[2], c[1]]).unwrap();

    let mut builder = PathIndexBuilder::new();
    builder.bind("l", links.into_ref()).unwrap();
    builder.bind("p", points.into_ref()).unwrap();
    builder.bind("c", cells.into_ref()).unwrap();

    let to_points = PathExpression::ev(Var::new("l"), Var::new("p"));
    let index = builder.build_segmented(&to_points, 0).unwrap();
    assert!(index.as_segmented().is_some());
    assert_eq!(index.row_width(), Some(1));
    assert_eq!(rows(&index), [[2], [0], [2]]);

    let from_cells = PathExpression::ve(Var::new("c"), Var::new("l"));
    let index = builder.build_segmented(&from_cells, 0).unwrap();
    assert_eq!(rows(&index), vec![vec![0], vec![1, 2]]);

    let from_points = PathExpression::ve(Var::new("p"), Var::new("l"));
    let index = builder.build_segmented(&from_points, 0).unwrap();
    assert_eq!(rows(&index), vec![vec![1], vec![], vec![0, 2]]);
}

#[test]
fn test_self_loops_repeat_in_links_but_not_in_joins() {
    let mut v = Set::new("V");
    let a = v.add().unwrap();
    let b = v.add().unwrap();
    let mut e = Set::edge_set("E", &[&v, &v]);
    e.add_edge(&[a, a]).unwrap();
    e.add_edge(&[a, b]).unwrap();

    let mut builder = PathIndexBuilder::new();
    builder.bind("v", v.into_ref()).unwrap();
    builder.bind("vi", builder.binding("v").unwrap().clone()).unwrap();
    builder.bind("vj", builder.binding("v").unwrap().clone()).unwrap();
    builder.bind("e", e.into_ref()).unwrap();

    let index = builder.build_segmented(&ve(), 0).unwrap();
    assert_eq!(rows(&index), vec![vec![0, 0, 1], vec![1]]);

    let index = builder.build_segmented(&vev(), 0).unwrap();
    assert_eq!(rows(&index), [vec![0, 1], vec![0, 1]]);
}

#[test]
fn test_antiparallel_edges_keep_both_contributions() {
    let mut v = Set::new("V");
    let a = v.add().unwrap();
    let b = v.add().unwrap();
    let mut e = Set::edge_set("E", &[&v, &v]);
    e.add_edge(&[a, b]).unwrap();
    e.add_edge(&[b, a]).unwrap();
    let v = v.into_ref();

    let mut builder = PathIndexBuilder::new();
    builder.bind("v", v.clone()).unwrap();
    builder.bind("vi", v.clone()).unwrap();
    builder.bind("vj", v).unwrap();
    builder.bind("e", e.into_ref()).unwrap();

    let incident = builder.build_segmented(&ve(), 0).unwrap();
    assert_eq!(rows(&incident), [[0, 1], [0, 1]]);

    let index = builder.build_segmented(&vev(), 0).unwrap();
    assert_eq!(rows(&index), [[0, 1], [0, 1]]);
}

#[test]
fn test_ev_rejects_vertex_sets_and_foreign_targets() {
    let (mut builder, _v, _e) = chain_builder();
    let other = Set::new("W");
    builder.bind("w", other.into_ref()).unwrap();

    let vertex_as_edge = PathExpression::ev(Var::new("v"), Var::new("vi"));
    assert!(matches!(
        builder.build_segmented(&vertex_as_edge, 0),
        Err(PathError::NotAnEdgeSet { .. })
    ));

    let foreign = PathExpression::ev(Var::new("e"), Var::new("w"));
    assert_eq!(
        builder.build_segmented(&foreign, 0).unwrap_err(),
        PathError::EndpointSetMismatch {
            edge_set: "E".to_string(),
            vertex_set: "W".to_string(),
        }
    );
}

#[test]
fn test_invalid_source_endpoint() {
    let (mut builder, _v, _e) = chain_builder();
    assert!(matches!(
        builder.build_segmented(&ev(), 2),
        Err(PathError::InvalidSourceEndpoint { ordinal: 2, .. })
    ));
}

// ============================================================================
// Stencils
// ============================================================================

fn grid_builder() -> (PathIndexBuilder, SetRef) {
    let grid = Set::lattice("grid", vec![4, 3]).unwrap().into_ref();
    let mut builder = PathIndexBuilder::new();
    builder.bind("u", grid.clone()).unwrap();
    builder.bind("w", grid.clone()).unwrap();
    (builder, grid)
}

#[test]
fn test_star_stencil_wraps_periodically() {
    let (mut builder, _grid) = grid_builder();
    let star = PathExpression::vv(Var::new("u"), Var::new("w"), Stencil::star(2));
    let index = builder.build_segmented(&star, 0).unwrap();

    assert_eq!(index.num_elements(), 12);
    assert_eq!(index.row_width(), Some(5));
    // center, -x, +x, -y, +y
    assert_eq!(index.neighbors(0).collect::<Vec<_>>(), [0, 3, 1, 8, 4]);
    assert_eq!(index.neighbors(5).collect::<Vec<_>>(), [5, 4, 6, 1, 9]);

    let inverse = builder.build_segmented(&star, 1).unwrap();
    assert_eq!(inverse.neighbors(0).collect::<Vec<_>>(), [0, 1, 3, 4, 8]);
}

#[test]
fn test_stencil_errors() {
    let (mut builder, _grid) = grid_builder();
    let other = Set::lattice("other", vec![4, 3]).unwrap().into_ref();
    let plain = Set::new("plain").into_ref();
    builder.bind("o", other).unwrap();
    builder.bind("p", plain).unwrap();

    let mismatch = PathExpression::vv(Var::new("u"), Var::new("o"), Stencil::star(2));
    assert!(matches!(
        builder.build_segmented(&mismatch, 0),
        Err(PathError::GridMismatch { .. })
    ));

    let not_grid = PathExpression::vv(Var::new("p"), Var::new("p2"), Stencil::star(1));
    builder.bind("p2", builder.binding("p").unwrap().clone()).unwrap();
    assert!(matches!(
        builder.build_segmented(&not_grid, 0),
        Err(PathError::NotALattice { .. })
    ));

    let arity = PathExpression::vv(Var::new("u"), Var::new("w"), Stencil::star(3));
    assert!(matches!(
        builder.build_segmented(&arity, 0),
        Err(PathError::StencilArity {
            expected: 2,
            found: 3,
            ..
        })
    ));
}

// ============================================================================
// Formulas
// ============================================================================

#[test]
fn test_vev_chain() {
    let (mut builder, _v, _e) = chain_builder();
    let index = builder.build_segmented(&vev(), 0).unwrap();
    assert_eq!(
        rows(&index),
        vec![
            vec![0, 1],
            vec![0, 1, 2],
            vec![1, 2, 3],
            vec![2, 3, 4],
            vec![3, 4],
        ]
    );
    let seg = index.as_segmented().expect("segmented layout");
    assert_eq!(seg.coord_data(), &[0, 2, 5, 8, 11, 13]);
    assert_eq!(index.num_neighbors(), 13);
}

#[test]
fn test_eve_chain() {
    let (mut builder, _v, _e) = chain_builder();
    let eve = PathExpression::eve(Var::new("ei"), Var::new("v"), Var::new("ej")).unwrap();
    let index = builder.build_segmented(&eve, 0).unwrap();
    assert_eq!(
        rows(&index),
        vec![vec![0, 1], vec![0, 1, 2], vec![1, 2, 3], vec![2, 3]]
    );
}

#[test]
fn test_and_is_insensitive_to_operand_order() {
    let (mut builder, _v, _e) = chain_builder();
    let swapped = PathExpression::and(
        vec![Var::new("vi"), Var::new("vj")],
        vec![QuantifiedVar::exists(Var::new("e"))],
        PathExpression::ev(Var::new("e"), Var::new("vj")),
        PathExpression::ve(Var::new("vi"), Var::new("e")),
    )
    .unwrap();
    let a = builder.build_segmented(&vev(), 0).unwrap();
    let b = builder.build_segmented(&swapped, 0).unwrap();
    assert_eq!(rows(&a), rows(&b));
}

/// Two edge sets over the same five vertices.
fn two_graph_builder() -> PathIndexBuilder {
    let mut v = Set::new("V");
    let mut chain = Set::edge_set("chain", &[&v, &v]);
    let mesh = create_box(&mut v, &mut chain, 5, 1, 1).unwrap();
    let mut extra = Set::edge_set("extra", &[&v, &v]);
    let at = |i: usize| mesh.vertices()[i];
    extra.add_edge(&[at(0), at(2)]).unwrap();
    extra.add_edge(&[at(1), at(2)]).unwrap();

    let v = v.into_ref();
    let mut builder = PathIndexBuilder::new();
    builder.bind("a", v.clone()).unwrap();
    builder.bind("b", v).unwrap();
    builder.bind("e", chain.into_ref()).unwrap();
    builder.bind("f", extra.into_ref()).unwrap();
    builder
}

fn adjacency(edge_var: &str) -> PathExpression {
    PathExpression::vev(Var::new("a"), Var::new(edge_var), Var::new("b")).unwrap()
}

#[test]
fn test_unquantified_and_intersects_rows() {
    let mut builder = two_graph_builder();
    let both = PathExpression::and(
        vec![Var::new("a"), Var::new("b")],
        vec![],
        adjacency("e"),
        adjacency("f"),
    )
    .unwrap();
    let index = builder.build_segmented(&both, 0).unwrap();
    assert_eq!(
        rows(&index),
        vec![vec![0], vec![1, 2], vec![1, 2], vec![], vec![]]
    );
}

#[test]
fn test_unquantified_or_unions_rows() {
    let mut builder = two_graph_builder();
    let either = PathExpression::or(
        vec![Var::new("a"), Var::new("b")],
        vec![],
        adjacency("e"),
        adjacency("f"),
    )
    .unwrap();
    let index = builder.build_segmented(&either, 0).unwrap();
    assert_eq!(
        rows(&index),
        vec![
            vec![0, 1, 2],
            vec![0, 1, 2],
            vec![0, 1, 2, 3],
            vec![2, 3, 4],
            vec![3, 4],
        ]
    );
}

#[test]
fn test_every_connective_ignores_operand_order() {
    let mut builder = two_graph_builder();
    let free = || vec![Var::new("a"), Var::new("b")];
    let exists_e = || vec![QuantifiedVar::exists(Var::new("e"))];
    let ve_ae = || PathExpression::ve(Var::new("a"), Var::new("e"));
    let ev_eb = || PathExpression::ev(Var::new("e"), Var::new("b"));

    let pairs = [
        (
            PathExpression::and(free(), vec![], adjacency("e"), adjacency("f")),
            PathExpression::and(free(), vec![], adjacency("f"), adjacency("e")),
        ),
        (
            PathExpression::or(free(), vec![], adjacency("e"), adjacency("f")),
            PathExpression::or(free(), vec![], adjacency("f"), adjacency("e")),
        ),
        (
            PathExpression::and(free(), exists_e(), ve_ae(), ev_eb()),
            PathExpression::and(free(), exists_e(), ev_eb(), ve_ae()),
        ),
        (
            PathExpression::or(free(), exists_e(), ve_ae(), ev_eb()),
            PathExpression::or(free(), exists_e(), ev_eb(), ve_ae()),
        ),
    ];
    for (forward, swapped) in pairs {
        let (forward, swapped) = (forward.unwrap(), swapped.unwrap());
        for source in 0..2 {
            let a = builder.build_segmented(&forward, source).unwrap();
            let b = builder.build_segmented(&swapped, source).unwrap();
            assert_eq!(rows(&a), rows(&b), "{forward} from endpoint {source}");
        }
    }
}

#[test]
fn test_quantified_or_reaches_whole_sink_set() {
    let mut v = Set::new("V");
    let mut e = Set::edge_set("E", &[&v, &v]);
    create_box(&mut v, &mut e, 5, 1, 1).unwrap();
    v.add().unwrap(); // isolated v5
    let v = v.into_ref();

    let mut builder = PathIndexBuilder::new();
    builder.bind("vi", v.clone()).unwrap();
    builder.bind("vj", v).unwrap();
    builder.bind("e", e.into_ref()).unwrap();

    let any = PathExpression::or(
        vec![Var::new("vi"), Var::new("vj")],
        vec![QuantifiedVar::exists(Var::new("e"))],
        PathExpression::ve(Var::new("vi"), Var::new("e")),
        PathExpression::ev(Var::new("e"), Var::new("vj")),
    )
    .unwrap();
    let index = builder.build_segmented(&any, 0).unwrap();

    let everything: Vec<u32> = (0..6).collect();
    for e in 0..5 {
        assert_eq!(index.neighbors(e).collect::<Vec<_>>(), everything);
    }
    assert_eq!(index.num_neighbors_of(5), 0);
}

// ============================================================================
// Access
// ============================================================================

#[test]
fn test_neighbor_access_out_of_range() {
    let (mut builder, _v, _e) = chain_builder();
    for source in [ev(), ve(), vev()] {
        let index = builder.build_segmented(&source, 0).unwrap();
        let n = index.num_elements() as u32;
        assert_eq!(index.neighbors(n).len(), 0);
        assert_eq!(
            index.try_neighbors(n).unwrap_err(),
            PathError::ElementOutOfRange {
                element: n,
                num_elements: n as usize,
            }
        );
        assert!(index.try_neighbors(0).is_ok());
    }
}

#[test]
fn test_neighbors_are_restartable() {
    let (mut builder, _v, _e) = chain_builder();
    let index = builder.build_segmented(&vev(), 0).unwrap();
    let nbrs = index.neighbors(2);
    assert_eq!(nbrs.as_slice(), &[1, 2, 3]);
    let first: Vec<u32> = nbrs.clone().collect();
    let second: Vec<u32> = nbrs.collect();
    assert_eq!(first, second);

    let sources: Vec<u32> = (&index).into_iter().collect();
    assert_eq!(sources, [0, 1, 2, 3, 4]);
    assert_eq!(index.rows().count(), 5);
}

#[test]
fn test_display_lists_rows() {
    let (mut builder, _v, _e) = chain_builder();
    let index = builder.build_segmented(&ev(), 0).unwrap();
    assert_eq!(
        index.to_string(),
        "SetEndpointPathIndex(E):\n  0: 0 1\n  1: 1 2\n  2: 2 3\n  3: 3 4\n"
    );

    let index = builder.build_segmented(&ve(), 0).unwrap();
    assert!(index.to_string().starts_with("SegmentedPathIndex:\n  0: 0\n  1: 0 1\n"));
}

// ============================================================================
// Packing
// ============================================================================

#[test]
fn test_pack_fills_missing_rows() {
    let packed = SegmentedPathIndex::pack(4, [(2, vec![3, 1]), (0, vec![2])], true).unwrap();
    assert_eq!(packed.coord_data(), &[0, 1, 1, 3, 3]);
    assert_eq!(packed.sink_data(), &[2, 1, 3]);
    assert_eq!(packed.row(2), &[1, 3]);
    assert_eq!(packed.row(7), &[] as &[u32]);
    assert_eq!(packed.row_width(), None);

    let unsorted = SegmentedPathIndex::pack(3, [(2, vec![3, 1])], false).unwrap();
    assert_eq!(unsorted.row(2), &[3, 1]);

    assert_eq!(
        SegmentedPathIndex::pack(2, [(2, vec![0])], true).unwrap_err(),
        PathError::ElementOutOfRange {
            element: 2,
            num_elements: 2,
        }
    );
}

#[test]
fn test_empty_sets_give_empty_indices() {
    let v = Set::new("V");
    let e = Set::edge_set("E", &[&v, &v]);
    let mut builder = PathIndexBuilder::new();
    builder.bind("v", v.into_ref()).unwrap();
    builder.bind("e", e.into_ref()).unwrap();

    let index = builder.build_segmented(&ve(), 0).unwrap();
    assert_eq!(index.num_elements(), 0);
    assert_eq!(index.num_neighbors(), 0);
    assert_eq!(index.iter().count(), 0);

    let index = builder.build_segmented(&ev(), 0).unwrap();
    assert_eq!(index.num_elements(), 0);
}
