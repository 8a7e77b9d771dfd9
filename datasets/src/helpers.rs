use ndarray::{Array1, ArrayView1, Axis, Zip};

use crate::{Dataset, Item, Result};

/// Returns a copy of `dataset` where every NaN is replaced by the mean of its component.
///
/// The mean of a component is taken over the non NaN values of that component in the whole
/// field, over every timestep for sequence fields. Components without a single value stay NaN.
///
/// # Errors
/// `OutOfSync` if the fields don't all have the same length, or any io error from the
/// underlying containers.
pub fn replace_nans_by_means(dataset: &Dataset) -> Result<Dataset> {
    let dims = dataset.dims();
    let mut sums: Vec<_> = dims.iter().map(|&dim| Array1::<f64>::zeros(dim)).collect();
    let mut counts: Vec<_> = dims.iter().map(|&dim| Array1::<f64>::zeros(dim)).collect();

    for row in dataset.iter()? {
        for (idx, item) in row?.iter().enumerate() {
            for values in rows_of(item) {
                Zip::from(&mut sums[idx])
                    .and(&mut counts[idx])
                    .and(&values)
                    .for_each(|sum, count, &x| {
                        if !x.is_nan() {
                            *sum += x;
                            *count += 1.0;
                        }
                    });
            }
        }
    }

    let means: Vec<_> = sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            Zip::from(&sum)
                .and(&count)
                .map_collect(|&s, &c| if c > 0.0 { s / c } else { f64::NAN })
        })
        .collect();

    let mut filled = dataset.empty_like()?;
    for row in dataset.iter()? {
        let row = row?
            .into_iter()
            .zip(&means)
            .map(|(item, mean)| fill_nans(item, mean))
            .collect();

        filled.append_row(row)?;
    }

    Ok(filled)
}

fn rows_of(item: &Item) -> Vec<ArrayView1<'_, f64>> {
    match item {
        Item::Scalar(x) => vec![ArrayView1::from(std::slice::from_ref(x))],
        Item::Vector(v) => vec![v.view()],
        Item::Sequence(s) => s.axis_iter(Axis(0)).collect(),
    }
}

fn fill_nans(item: Item, means: &Array1<f64>) -> Item {
    let fill = |x: &mut f64, &mean: &f64| {
        if x.is_nan() {
            *x = mean;
        }
    };

    match item {
        Item::Scalar(x) if x.is_nan() => Item::Scalar(means[0]),
        Item::Scalar(x) => Item::Scalar(x),
        Item::Vector(mut v) => {
            v.zip_mut_with(means, fill);
            Item::Vector(v)
        }
        Item::Sequence(mut s) => {
            for mut row in s.axis_iter_mut(Axis(0)) {
                row.zip_mut_with(means, fill);
            }

            Item::Sequence(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Backend, FieldSpec, Schema};

    #[test]
    fn nans_become_component_means() {
        let schema = Schema::new([FieldSpec::vectors("x"), FieldSpec::scalars("y")]).unwrap();
        let ds = Dataset::from_iterables(
            schema,
            vec![
                vec![
                    Item::vector([1., f64::NAN]),
                    Item::vector([f64::NAN, f64::NAN]),
                    Item::vector([3., f64::NAN]),
                ],
                vec![Item::Scalar(f64::NAN), Item::Scalar(2.), Item::Scalar(4.)],
            ],
            Backend::Array,
        )
        .unwrap();

        let filled = replace_nans_by_means(&ds).unwrap();

        let row = filled.get(1).unwrap();
        let x = row[0].as_vector().unwrap();
        assert_eq!(x[0], 2.);
        assert!(x[1].is_nan());
        assert_eq!(filled.get(0).unwrap()[1], Item::Scalar(3.));

        // The source is left untouched.
        assert!(ds.get(0).unwrap()[1].as_scalar().unwrap().is_nan());
    }

    #[test]
    fn sequence_means_span_every_timestep() {
        let schema = Schema::new([FieldSpec::sequences("s")]).unwrap();
        let ds = Dataset::from_iterables(
            schema,
            vec![vec![
                Item::sequence(1, [[1.], [f64::NAN]]).unwrap(),
                Item::sequence(1, [[5.]]).unwrap(),
            ]],
            Backend::List,
        )
        .unwrap();

        let filled = replace_nans_by_means(&ds).unwrap();
        assert_eq!(
            filled.get(0).unwrap()[0],
            Item::sequence(1, [[1.], [3.]]).unwrap()
        );
    }
}
