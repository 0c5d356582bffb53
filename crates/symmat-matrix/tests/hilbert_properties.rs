use symmat_matrix::{HilbertMatrix, Identity, InverseHilbertMatrix, MatExpr, MatrixError};
use symmat_symbolic::{EvalOptions, SymExpr, Symbol, SymbolAttrs};

fn n() -> SymExpr {
    SymExpr::symbol(Symbol::with_attrs("n", SymbolAttrs::dimension()))
}

#[test]
fn one_by_one() {
    let h = HilbertMatrix::new(1).unwrap();
    assert_eq!(h.entry(0, 0), SymExpr::int(1));
    assert_eq!(h.determinant().doit().unwrap(), SymExpr::int(1));
    assert_eq!(h.inverse().entry(0, 0), SymExpr::int(1));
    assert_eq!(h.inverse().determinant().doit().unwrap(), SymExpr::int(1));
}

#[test]
fn two_by_two() {
    let h = HilbertMatrix::new(2).unwrap();
    let expected = [
        [SymExpr::int(1), SymExpr::rational(1, 2)],
        [SymExpr::rational(1, 2), SymExpr::rational(1, 3)],
    ];
    for (i, row) in expected.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            assert_eq!(&h.entry(i, j), value);
        }
    }
    assert_eq!(h.determinant().doit().unwrap(), SymExpr::rational(1, 12));

    let inv = h.inverse();
    let expected_inv = [[4, -6], [-6, 12]];
    for (i, row) in expected_inv.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            assert_eq!(inv.entry(i, j), SymExpr::int(*value));
        }
    }
    assert_eq!(inv.determinant().doit().unwrap(), SymExpr::int(12));

    let product = (MatExpr::from(h.clone()) * MatExpr::from(inv)).unwrap();
    assert_eq!(product.doit(), MatExpr::from(Identity::new(2).unwrap()));
    let explicit = product.as_explicit().unwrap();
    assert!(explicit.is_identity(), "{explicit}");
}

#[test]
fn product_is_identity_up_to_eight() {
    for size in 1..=8 {
        let h = HilbertMatrix::new(size).unwrap();
        let forward = (MatExpr::from(h.clone()) * MatExpr::from(h.inverse())).unwrap();
        let backward = (MatExpr::from(h.inverse()) * MatExpr::from(h)).unwrap();
        assert!(forward.as_explicit().unwrap().is_identity(), "H*H^-1, n = {size}");
        assert!(backward.as_explicit().unwrap().is_identity(), "H^-1*H, n = {size}");
    }
}

#[test]
fn inverse_is_an_involution() {
    for dim in [SymExpr::int(0), SymExpr::int(5), SymExpr::var("n"), n() + 3] {
        let h = HilbertMatrix::new(dim.clone()).unwrap();
        assert_eq!(h.inverse().inverse(), h);
        let inv = InverseHilbertMatrix::new(dim).unwrap();
        assert_eq!(inv.inverse().inverse(), inv);
        assert_eq!(h.inverse(), inv);
    }
}

#[test]
fn determinants_are_reciprocal_for_symbolic_n() {
    for dim in [SymExpr::var("n"), n(), n() * 2 + 1] {
        let h = HilbertMatrix::new(dim).unwrap();
        let product = h.determinant() * h.inverse().determinant();
        assert_eq!(product.simplify(), SymExpr::int(1), "{product}");
    }
}

#[test]
fn inverse_determinant_is_one_over_determinant() {
    for dim in [SymExpr::var("n"), n(), n() * 2 + 1] {
        let h = HilbertMatrix::new(dim).unwrap();
        assert_eq!(
            (h.determinant() / h.determinant()).simplify(),
            SymExpr::int(1)
        );
        let difference = h.inverse().determinant() - SymExpr::int(1) / h.determinant();
        assert_eq!(difference.simplify(), SymExpr::int(0), "{difference}");
    }
}

#[test]
fn determinants_are_reciprocal_for_concrete_n() {
    let h = HilbertMatrix::new(n()).unwrap();
    for size in 0..=7 {
        let value = SymExpr::int(size);
        let det = h.determinant().substitute("n", &value).doit().unwrap();
        let inv_det = h
            .inverse()
            .determinant()
            .substitute("n", &value)
            .doit()
            .unwrap();
        assert_eq!((det * inv_det).simplify(), SymExpr::int(1), "n = {size}");
    }
}

#[test]
fn known_determinants() {
    // 1/12, 1/2160, 1/6048000
    let cases = [(2, 12i64), (3, 2160), (4, 6_048_000)];
    for (size, denominator) in cases {
        let det = HilbertMatrix::new(size)
            .unwrap()
            .determinant()
            .evaluate(&EvalOptions::default())
            .unwrap();
        assert_eq!(SymExpr::num(det), SymExpr::rational(1, denominator));
    }
}

#[test]
fn large_n_stays_lazy() {
    let h = HilbertMatrix::new(10_000_000i64).unwrap();
    assert_eq!(h.entry(9_999_999, 0), SymExpr::rational(1, 10_000_000));
    let det = h.determinant();
    assert!(det.to_string().contains("Product("));
    let err = det.doit_with(&EvalOptions { max_terms: 1000 }).unwrap_err();
    assert!(matches!(
        err,
        symmat_symbolic::SymbolicError::EvaluationLimit { limit: 1000, .. }
    ));
}

#[test]
fn invalid_dimensions_fail_at_construction() {
    for bad in [SymExpr::int(-1), SymExpr::float(1.5)] {
        assert!(matches!(
            HilbertMatrix::new(bad.clone()),
            Err(MatrixError::InvalidDimension(_))
        ));
        assert!(matches!(
            InverseHilbertMatrix::new(bad),
            Err(MatrixError::InvalidDimension(_))
        ));
    }
    assert!(HilbertMatrix::new(-1).is_err());
    assert!(HilbertMatrix::new(1.5).is_err());
    // Integral floats are still floats
    assert!(matches!(
        HilbertMatrix::new(2.0),
        Err(MatrixError::InvalidDimension(_))
    ));
    assert!(InverseHilbertMatrix::new(1e20).is_err());
    assert!(HilbertMatrix::new(2).is_ok());
}

#[test]
fn shape_is_n_by_n() {
    let symbolic = HilbertMatrix::new(SymExpr::var("n")).unwrap();
    assert_eq!(
        symbolic.shape(),
        (SymExpr::var("n"), SymExpr::var("n"))
    );
    let concrete = InverseHilbertMatrix::new(4).unwrap();
    assert_eq!(concrete.shape(), (SymExpr::int(4), SymExpr::int(4)));
    let wrapped = MatExpr::from(concrete);
    assert!(wrapped.is_square());
}

#[test]
fn symbolic_inverse_entry_matches_concrete() {
    let inv = InverseHilbertMatrix::new(SymExpr::var("n")).unwrap();
    let general = inv.entry(SymExpr::var("i"), SymExpr::var("j"));
    let concrete = InverseHilbertMatrix::new(4).unwrap();
    for i in 0..4i64 {
        for j in 0..4i64 {
            let at = general
                .substitute("n", &SymExpr::int(4))
                .substitute("i", &SymExpr::int(i))
                .substitute("j", &SymExpr::int(j))
                .simplify();
            assert_eq!(at, concrete.entry(i, j), "({i}, {j})");
        }
    }
}

#[test]
fn nodes_are_shared_across_threads() {
    let h = HilbertMatrix::new(SymExpr::var("n")).unwrap();
    let results: Vec<SymExpr> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4i64)
            .map(|size| {
                let h = &h;
                scope.spawn(move || {
                    h.determinant()
                        .substitute("n", &SymExpr::int(size))
                        .doit()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });
    assert_eq!(results[0], SymExpr::int(1));
    assert_eq!(results[1], SymExpr::rational(1, 12));
    assert_eq!(results[2], SymExpr::rational(1, 2160));
}
