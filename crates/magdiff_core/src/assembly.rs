//! Global assembly over a mesh of axisymmetric magnetic elements.

use crate::element::AxisymmetricMagneticElement;
use crate::error::{MagError, MagResult};
use crate::material::{EvalMode, Material};
use crate::node::{Node, TimeOrder};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CooMatrix;

/// Global matrices restricted to the free equations.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSystem {
    pub k: DMatrix<f64>,
    pub d: DMatrix<f64>,
    pub m: DMatrix<f64>,
    pub r: DVector<f64>,
}

pub struct Mesh {
    pub nodes: Vec<Node>,
    elements: Vec<AxisymmetricMagneticElement>,
    materials: Vec<Material>,
    next_slot: Vec<usize>,
    equations: usize,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            elements: Vec::new(),
            materials: Vec::new(),
            next_slot: Vec::new(),
            equations: 0,
        }
    }

    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn add_material(&mut self, material: impl Into<Material>) -> usize {
        self.materials.push(material.into());
        self.next_slot.push(0);
        self.materials.len() - 1
    }

    /// Adds `element`, assigning it the next free range of its material's
    /// history slots.
    pub fn add_element(&mut self, mut element: AxisymmetricMagneticElement) -> MagResult<usize> {
        let index = element.material();
        let material = self
            .materials
            .get(index)
            .ok_or(MagError::MaterialNotFound(index))?;
        if let Some(&missing) = element.nodes().iter().find(|&&n| n >= self.nodes.len()) {
            return Err(MagError::InvalidElement(format!(
                "node {missing} does not exist"
            )));
        }

        let offset = self.next_slot[index];
        let needed = offset + element.rule().len();
        if let Some(capacity) = material.history_capacity() {
            if needed > capacity {
                return Err(MagError::InvalidElement(format!(
                    "material {} has {} history slots, element needs up to {}",
                    material.id(),
                    capacity,
                    needed
                )));
            }
        }
        element.set_history_offset(offset);
        self.next_slot[index] = needed;
        self.elements.push(element);
        Ok(self.elements.len() - 1)
    }

    pub fn elements(&self) -> &[AxisymmetricMagneticElement] {
        &self.elements
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut AxisymmetricMagneticElement> {
        self.elements.get_mut(index)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    pub fn set_time_order(&mut self, order: TimeOrder) {
        for element in &mut self.elements {
            element.set_time_order(order);
        }
    }

    /// Highest time order declared by any element.
    pub fn time_order(&self) -> TimeOrder {
        self.elements
            .iter()
            .map(|e| e.time_order())
            .max_by_key(|o| o.order())
            .unwrap_or(TimeOrder::Static)
    }

    /// Number free nodes consecutively. Returns the equation count.
    pub fn number_equations(&mut self) -> usize {
        let mut next = 0;
        for node in &mut self.nodes {
            node.equation = if node.constrained {
                None
            } else {
                next += 1;
                Some(next - 1)
            };
        }
        self.equations = next;
        next
    }

    pub fn equations(&self) -> usize {
        self.equations
    }

    /// Evaluate every element at time `t` and scatter into the free equations.
    pub fn assemble(&mut self, t: f64, mode: EvalMode) -> MagResult<GlobalSystem> {
        let n = self.equations;
        let mut k = CooMatrix::new(n, n);
        let mut d = CooMatrix::new(n, n);
        let mut m = CooMatrix::new(n, n);
        let mut r = DVector::zeros(n);

        for element in &self.elements {
            let material = self
                .materials
                .get_mut(element.material())
                .ok_or(MagError::MaterialNotFound(element.material()))?;
            let local = element.evaluate(&self.nodes, material, t, mode)?;

            let equations: Vec<Option<usize>> = element
                .nodes()
                .iter()
                .map(|&node| self.nodes[node].equation)
                .collect();
            for (i, eq_i) in equations.iter().enumerate() {
                let Some(row) = *eq_i else { continue };
                r[row] += local.r[i];
                for (j, eq_j) in equations.iter().enumerate() {
                    let Some(col) = *eq_j else { continue };
                    k.push(row, col, local.k[(i, j)]);
                    d.push(row, col, local.d[(i, j)]);
                    m.push(row, col, local.m[(i, j)]);
                }
            }
        }

        for node in &self.nodes {
            if let Some(row) = node.equation {
                r[row] -= node.load;
            }
        }

        Ok(GlobalSystem {
            k: DMatrix::from(&k),
            d: DMatrix::from(&d),
            m: DMatrix::from(&m),
            r,
        })
    }

    /// Unknowns of the free equations.
    pub fn free_values(&self) -> DVector<f64> {
        let mut values = DVector::zeros(self.equations);
        for node in &self.nodes {
            if let Some(eq) = node.equation {
                values[eq] = node.u;
            }
        }
        values
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
