use ndarray::{Array1, ArrayView1};

use crate::{Result, arch::check_dim, network::Network, sequence::Sequence};

/// Error and ponderation of a single timestep.
///
/// # Returns
/// The error, the ponderation and the output error to propagate back.
fn timestep_error(
    target: ArrayView1<f64>,
    output: &Array1<f64>,
    importance: Option<ArrayView1<f64>>,
) -> (f64, f64, Array1<f64>) {
    let out_err = &target - output;

    match importance {
        Some(importance) => {
            let error = 0.5 * importance.dot(&out_err.mapv(|e| e * e));
            (error, importance.sum(), out_err * importance)
        }
        None => {
            let error = 0.5 * out_err.dot(&out_err);
            (error, target.len() as f64, out_err)
        }
    }
}

fn check_dims<N: Network + ?Sized>(network: &N, seq: &Sequence) -> Result<()> {
    check_dim("sequence inputs", seq.input_dim(), network.input_dim())?;
    check_dim("sequence targets", seq.target_dim(), network.output_dim())
}

/// Runs `seq` through the network and backpropagates its error through time.
///
/// The recurrent state of the network is reset first, its derivative accumulator isn't: the
/// derivatives of this sequence are added to whatever it already held.
///
/// # Arguments
/// * `network` - The network to run.
/// * `seq` - The sequence.
///
/// # Returns
/// The error and ponderation of the sequence.
pub fn calc_derivs<N: Network + ?Sized>(network: &mut N, seq: &Sequence) -> Result<(f64, f64)> {
    check_dims(network, seq)?;
    network.reset();

    let outputs = seq
        .inputs()
        .map(|input| network.activate(input))
        .collect::<Result<Vec<_>>>()?;

    let mut error = 0.;
    let mut ponderation = 0.;

    for (t, output) in outputs.iter().enumerate().rev() {
        let (e, p, out_err) = timestep_error(seq.target(t), output, seq.importance(t));
        error += e;
        ponderation += p;
        network.back_activate(out_err.view())?;
    }

    Ok((error, ponderation))
}

/// Computes the derivatives of a single sequence from scratch.
///
/// # Returns
/// The error, the ponderation and a copy of the derivatives of the sequence.
pub fn sequence_gradient<N: Network + ?Sized>(
    network: &mut N,
    seq: &Sequence,
) -> Result<(f64, f64, Vec<f64>)> {
    network.reset_derivatives();
    let (error, ponderation) = calc_derivs(network, seq)?;
    Ok((error, ponderation, network.derivs().to_vec()))
}

/// Runs `seq` forward only.
///
/// # Returns
/// The error and ponderation of the sequence.
pub fn evaluate_sequence<N: Network + ?Sized>(
    network: &mut N,
    seq: &Sequence,
) -> Result<(f64, f64)> {
    check_dims(network, seq)?;
    network.reset();

    let mut error = 0.;
    let mut ponderation = 0.;

    for (t, input) in seq.inputs().enumerate() {
        let output = network.activate(input)?;
        let (e, p, _) = timestep_error(seq.target(t), &output, seq.importance(t));
        error += e;
        ponderation += p;
    }

    Ok((error, ponderation))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use datasets::Item;

    use super::*;
    use crate::arch::{Sequential, activations::ActFn, layers::Dense};

    /// A network whose output is always `[0.6, 0.4]`.
    fn constant_net() -> Sequential {
        let mut net = Sequential::new([Dense::new((1, 2), ActFn::Identity)]).unwrap();
        net.params_mut().copy_from_slice(&[0., 0., 0.6, 0.4]);
        net
    }

    #[test]
    fn half_squared_error_and_target_dim() {
        let mut net = constant_net();
        let seq = Sequence::from_row(vec![Item::vector([1.]), Item::vector([1., 0.])]).unwrap();

        let (error, ponderation) = calc_derivs(&mut net, &seq).unwrap();
        assert_abs_diff_eq!(error, 0.16, epsilon = 1e-12);
        assert_eq!(ponderation, 2.);

        // Only the biases of an identity layer fed with 1 see `target - output`.
        assert_abs_diff_eq!(net.derivs()[2], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(net.derivs()[3], -0.4, epsilon = 1e-12);
    }

    #[test]
    fn importance_weights_error_but_not_ponderation_squares() {
        let mut net = constant_net();
        let seq = Sequence::from_row(vec![
            Item::sequence(1, [[1.], [1.]]).unwrap(),
            Item::sequence(2, [[1., 0.], [1., 0.]]).unwrap(),
            Item::sequence(2, [[2., 0.], [0.5, 0.5]]).unwrap(),
        ])
        .unwrap();

        let (error, ponderation) = calc_derivs(&mut net, &seq).unwrap();

        // 0.5 * (2 * 0.16 + 0) + 0.5 * (0.5 * 0.16 + 0.5 * 0.16)
        assert_abs_diff_eq!(error, 0.24, epsilon = 1e-12);
        assert_eq!(ponderation, 3.);

        // Backpropagated errors are scaled by the importance: 0.4 * 2 + 0.4 * 0.5.
        assert_abs_diff_eq!(net.derivs()[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(net.derivs()[3], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn derivatives_accumulate_until_reset() {
        let mut net = constant_net();
        let seq = Sequence::from_row(vec![Item::vector([1.]), Item::vector([1., 0.])]).unwrap();

        calc_derivs(&mut net, &seq).unwrap();
        calc_derivs(&mut net, &seq).unwrap();
        assert_abs_diff_eq!(net.derivs()[2], 0.8, epsilon = 1e-12);

        let (_, _, derivs) = sequence_gradient(&mut net, &seq).unwrap();
        assert_abs_diff_eq!(derivs[2], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn evaluation_leaves_derivatives_alone() {
        let mut net = constant_net();
        let seq = Sequence::from_row(vec![Item::vector([1.]), Item::vector([1., 0.])]).unwrap();

        let (error, ponderation) = evaluate_sequence(&mut net, &seq).unwrap();
        assert_abs_diff_eq!(error, 0.16, epsilon = 1e-12);
        assert_eq!(ponderation, 2.);
        assert!(net.derivs().iter().all(|&d| d == 0.));
    }

    #[test]
    fn mismatched_dimensions_are_errors() {
        let mut net = constant_net();
        let seq = Sequence::from_row(vec![Item::vector([1., 1.]), Item::vector([1., 0.])]).unwrap();
        assert!(calc_derivs(&mut net, &seq).is_err());
    }
}
