use anyhow::Result;
use ironknn::{AccumulatorState, Admission, BoundedTopK, Candidate, KnnError, finalize};

fn c(id: &str, distance: f64) -> Candidate {
    Candidate::new(id, distance)
}

#[test]
fn non_positive_k_is_a_config_error() {
    for k in [0, -1, i64::MIN] {
        match BoundedTopK::new(k) {
            Err(KnnError::Config(e)) => assert_eq!(e.field, "k"),
            other => panic!("k={k}: expected config error, got {other:?}"),
        }
    }
}

#[test]
fn state_follows_fill_and_eviction() -> Result<()> {
    let mut acc = BoundedTopK::new(2)?;
    assert_eq!(acc.state(), AccumulatorState::Empty);
    assert_eq!(acc.threshold(), None);

    assert_eq!(acc.observe(c("a", 3.0))?, Admission::Inserted);
    assert_eq!(acc.state(), AccumulatorState::Filling);
    assert_eq!(acc.threshold(), None);

    assert_eq!(acc.observe(c("b", 1.0))?, Admission::Inserted);
    assert_eq!(acc.state(), AccumulatorState::Full);
    assert_eq!(acc.threshold(), Some(&c("a", 3.0)));

    assert_eq!(acc.observe(c("far", 9.0))?, Admission::Rejected);
    assert_eq!(
        acc.observe(c("near", 2.0))?,
        Admission::Replaced {
            evicted: c("a", 3.0)
        }
    );
    assert_eq!(acc.state(), AccumulatorState::Full);
    assert_eq!(acc.len(), 2);
    assert_eq!(acc.threshold(), Some(&c("near", 2.0)));
    Ok(())
}

#[test]
fn never_holds_more_than_k() -> Result<()> {
    let mut acc = BoundedTopK::new(3)?;
    for i in 0..100 {
        acc.observe(c(&format!("p{i:03}"), f64::from(100 - i)))?;
        assert!(acc.len() <= 3);
    }
    assert_eq!(
        finalize(&mut acc)?,
        vec![c("p099", 1.0), c("p098", 2.0), c("p097", 3.0)]
    );
    Ok(())
}

#[test]
fn equal_distance_ties_go_to_the_smaller_identifier() -> Result<()> {
    // Arrival order must not matter.
    let mut first = BoundedTopK::new(1)?;
    first.observe(c("B", 1.0))?;
    assert_eq!(
        first.observe(c("A", 1.0))?,
        Admission::Replaced { evicted: c("B", 1.0) }
    );

    let mut second = BoundedTopK::new(1)?;
    second.observe(c("A", 1.0))?;
    assert_eq!(second.observe(c("B", 1.0))?, Admission::Rejected);

    // An exact duplicate keeps the resident.
    assert_eq!(second.observe(c("A", 1.0))?, Admission::Rejected);

    assert_eq!(finalize(&mut first)?, finalize(&mut second)?);
    Ok(())
}

#[test]
fn non_finite_distances_are_rejected_without_changing_state() -> Result<()> {
    let mut acc = BoundedTopK::new(2)?;
    acc.observe(c("a", 1.0))?;

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = acc.observe(c("bad", bad)).unwrap_err();
        assert!(matches!(err, KnnError::Computation { ref id, .. } if id == "bad"));
    }
    assert_eq!(acc.len(), 1);
    assert_eq!(acc.state(), AccumulatorState::Filling);
    Ok(())
}

#[test]
fn drain_yields_farthest_first_then_locks() -> Result<()> {
    let mut acc = BoundedTopK::new(3)?;
    for (id, d) in [("a", 2.0), ("b", 0.5), ("c", 7.0), ("d", 1.0)] {
        acc.observe(c(id, d))?;
    }

    let drained: Vec<Candidate> = acc.drain()?.collect();
    assert_eq!(drained, vec![c("a", 2.0), c("d", 1.0), c("b", 0.5)]);
    assert_eq!(acc.state(), AccumulatorState::Drained);
    assert!(acc.is_empty());

    assert_eq!(acc.observe(c("e", 0.1)).unwrap_err(), KnnError::AccumulatorDrained);
    assert!(matches!(acc.drain(), Err(KnnError::AccumulatorDrained)));
    assert_eq!(finalize(&mut acc).unwrap_err(), KnnError::AccumulatorDrained);
    Ok(())
}

#[test]
fn dropping_a_partial_drain_still_drains() -> Result<()> {
    let mut acc = BoundedTopK::new(4)?;
    for (id, d) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
        acc.observe(c(id, d))?;
    }
    {
        let mut drain = acc.drain()?;
        assert_eq!(drain.len(), 3);
        assert_eq!(drain.next(), Some(c("c", 3.0)));
    }
    assert_eq!(acc.state(), AccumulatorState::Drained);
    assert!(acc.is_empty());
    Ok(())
}

#[test]
fn finalize_is_ascending() -> Result<()> {
    let mut acc = BoundedTopK::new(10)?;
    for (id, d) in [("x", 4.0), ("y", 1.0), ("z", 1.0), ("w", 0.0)] {
        acc.observe(c(id, d))?;
    }
    assert_eq!(
        finalize(&mut acc)?,
        vec![c("w", 0.0), c("y", 1.0), c("z", 1.0), c("x", 4.0)]
    );
    Ok(())
}

#[test]
fn empty_accumulator_finalizes_to_nothing() -> Result<()> {
    let mut acc = BoundedTopK::new(5)?;
    assert!(finalize(&mut acc)?.is_empty());
    assert_eq!(acc.state(), AccumulatorState::Drained);
    Ok(())
}

#[test]
fn merge_keeps_the_nearest_k_of_both() -> Result<()> {
    let mut left = BoundedTopK::new(3)?;
    let mut right = BoundedTopK::new(3)?;
    for (id, d) in [("a", 5.0), ("b", 1.0), ("c", 3.0)] {
        left.observe(c(id, d))?;
    }
    for (id, d) in [("d", 2.0), ("e", 6.0), ("f", 3.0)] {
        right.observe(c(id, d))?;
    }

    left.merge(right)?;
    assert_eq!(left.len(), 3);
    assert_eq!(left.capacity(), 3);
    assert_eq!(left.threshold(), Some(&c("c", 3.0)));
    assert_eq!(
        finalize(&mut left)?,
        vec![c("b", 1.0), c("d", 2.0), c("c", 3.0)]
    );
    Ok(())
}

#[test]
fn merge_with_drained_side_fails() -> Result<()> {
    let mut live = BoundedTopK::new(2)?;
    let mut spent = BoundedTopK::new(2)?;
    finalize(&mut spent)?;

    assert_eq!(live.merge(spent).unwrap_err(), KnnError::AccumulatorDrained);
    Ok(())
}
