//! Composition of same-polarity constraints into one vector function.

use nalgebra::DMatrix;

use crate::constraint::{Constraint, Evaluation, Polarity};
use crate::error::{CoreError, Result};
use crate::robot::RobotState;

/// Ordered sequence of same-polarity constraints evaluated as one.
///
/// Residuals concatenate along the output axis and Jacobian rows stack in
/// member order, preserving per-configuration batch and per-dimension
/// column alignment. Members arrive already reflected (their constructors
/// took the robot state), so a composite is evaluable from birth; its own
/// `reflect` refreshes every member.
pub struct Composite {
    members: Vec<Box<dyn Constraint>>,
    polarity: Polarity,
}

impl Composite {
    /// Merges constraints into a composite.
    ///
    /// Fails on an empty member list or mixed polarities.
    pub fn new(members: Vec<Box<dyn Constraint>>) -> Result<Self> {
        let polarity = members
            .first()
            .ok_or(CoreError::EmptyComposite)?
            .polarity();
        for member in &members {
            if member.polarity() != polarity {
                return Err(CoreError::Polarity {
                    expected: polarity,
                    found: member.polarity(),
                    label: member.label(),
                });
            }
        }
        Ok(Self { members, polarity })
    }
}

impl Constraint for Composite {
    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn evaluate(&self, qs: &DMatrix<f64>, with_jacobian: bool) -> Evaluation {
        let n = qs.nrows();
        let dim = qs.ncols();
        let evals: Vec<Evaluation> = self
            .members
            .iter()
            .map(|member| member.evaluate(qs, with_jacobian))
            .collect();

        let total_outputs: usize = evals.iter().map(|e| e.values.ncols()).sum();
        let mut values = DMatrix::zeros(n, total_outputs);
        let mut offset = 0;
        for eval in &evals {
            let width = eval.values.ncols();
            values
                .columns_mut(offset, width)
                .copy_from(&eval.values);
            offset += width;
        }

        let jacobians = with_jacobian.then(|| {
            (0..n)
                .map(|i| {
                    let mut jac = DMatrix::zeros(total_outputs, dim);
                    let mut row = 0;
                    for eval in &evals {
                        let member_jacs = eval.jacobians.as_ref().expect("jacobians requested");
                        let height = member_jacs[i].nrows();
                        jac.rows_mut(row, height).copy_from(&member_jacs[i]);
                        row += height;
                    }
                    jac
                })
                .collect()
        });

        Evaluation { values, jacobians }
    }

    fn reflect(&mut self, state: &dyn RobotState) -> Result<()> {
        for member in &mut self.members {
            member.reflect(state)?;
        }
        Ok(())
    }

    fn label(&self) -> &'static str {
        "Composite"
    }

    fn members(&self) -> &[Box<dyn Constraint>] {
        &self.members
    }
}
