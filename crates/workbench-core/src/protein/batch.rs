use super::atoms::CA;
use super::error::BatchError;
use super::graph::{EdgeIndex, EdgeSpec, build_edges};
use super::residue::ResidueType;
use super::structure::{AtomCoords, AtomMask, BackboneDihedrals, Protein};
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// Per-node fields that can be named in `follow_batch`.
pub const FOLLOWABLE_FIELDS: [&str; 5] = ["coords", "atom_mask", "residue_type", "residue_id", "chains"];

#[derive(Debug, Clone, PartialEq, Default)]
struct DenoisingTargets {
    true_dihedrals: Option<Vec<BackboneDihedrals>>,
    true_residue_type: Option<Vec<ResidueType>>,
    true_coords: Option<Vec<AtomCoords>>,
}

/// Several proteins concatenated along the residue axis.
///
/// `batch[i]` names the graph that node `i` belongs to and `ptr[g]..ptr[g + 1]`
/// is the node range of graph `g`. Both stay aligned with the concatenated
/// per-node fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinBatch {
    pub coords: Vec<AtomCoords>,
    pub atom_mask: Vec<AtomMask>,
    pub residue_type: Vec<ResidueType>,
    pub residue_id: Vec<i32>,
    pub chains: Vec<char>,
    pub batch: Vec<usize>,
    pub ptr: Vec<usize>,
    /// Node positions, set by [`ProteinBatch::derive_node_features`].
    pub pos: Option<Vec<Point3<f64>>>,
    /// Node type indices, set by [`ProteinBatch::derive_node_features`].
    pub x: Option<Vec<usize>>,
    followed: BTreeMap<String, Vec<usize>>,
    edge_cache: HashMap<String, EdgeIndex>,
    targets: Vec<DenoisingTargets>,
}

impl ProteinBatch {
    /// Merges `proteins` into one batch and records `<field>_batch` membership
    /// vectors for every field named in `follow_batch`.
    #[instrument(level = "debug", skip_all, fields(graphs = proteins.len()))]
    pub fn from_protein_list<S: AsRef<str>>(
        proteins: Vec<Protein>,
        follow_batch: &[S],
    ) -> Result<Self, BatchError> {
        if proteins.is_empty() {
            return Err(BatchError::Empty);
        }
        for field in follow_batch {
            let field = field.as_ref();
            if !FOLLOWABLE_FIELDS.contains(&field) {
                return Err(BatchError::UnknownField {
                    field: field.to_string(),
                });
            }
        }

        let total: usize = proteins.iter().map(Protein::len).sum();
        let mut merged = Self {
            coords: Vec::with_capacity(total),
            atom_mask: Vec::with_capacity(total),
            residue_type: Vec::with_capacity(total),
            residue_id: Vec::with_capacity(total),
            chains: Vec::with_capacity(total),
            batch: Vec::with_capacity(total),
            ptr: Vec::with_capacity(proteins.len() + 1),
            pos: None,
            x: None,
            followed: BTreeMap::new(),
            edge_cache: HashMap::new(),
            targets: Vec::with_capacity(proteins.len()),
        };
        merged.ptr.push(0);

        for (graph, protein) in proteins.into_iter().enumerate() {
            protein.validate()?;
            let len = protein.len();
            merged.batch.extend(std::iter::repeat_n(graph, len));
            merged.ptr.push(merged.ptr[graph] + len);
            merged.coords.extend(protein.coords);
            merged.atom_mask.extend(protein.atom_mask);
            merged.residue_type.extend(protein.residue_type);
            merged.residue_id.extend(protein.residue_id);
            merged.chains.extend(protein.chains);
            merged.targets.push(DenoisingTargets {
                true_dihedrals: protein.true_dihedrals,
                true_residue_type: protein.true_residue_type,
                true_coords: protein.true_coords,
            });
        }

        for field in follow_batch {
            merged
                .followed
                .insert(format!("{}_batch", field.as_ref()), merged.batch.clone());
        }

        debug!(
            "Merged {} proteins into a batch of {} nodes",
            merged.num_graphs(),
            merged.num_nodes()
        );
        Ok(merged)
    }

    pub fn num_graphs(&self) -> usize {
        self.ptr.len().saturating_sub(1)
    }

    pub fn num_nodes(&self) -> usize {
        self.residue_type.len()
    }

    pub fn node_counts(&self) -> Vec<usize> {
        self.ptr.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// The `<field>_batch` vector recorded for a followed field.
    pub fn field_batch(&self, field: &str) -> Option<&[usize]> {
        self.followed
            .get(&format!("{}_batch", field))
            .map(Vec::as_slice)
    }

    /// Replaces `batch` with the membership vector recorded for `field`.
    pub fn assign_batch_from(&mut self, field: &str) -> Result<(), BatchError> {
        let values = self
            .field_batch(field)
            .ok_or_else(|| BatchError::UnknownField {
                field: format!("{}_batch", field),
            })?
            .to_vec();
        self.batch = values;
        Ok(())
    }

    pub fn ca_coords(&self) -> Vec<Point3<f64>> {
        self.coords.iter().map(|residue| residue[CA]).collect()
    }

    /// Sets `pos` to the CA coordinates and `x` to residue type indices.
    pub fn derive_node_features(&mut self) {
        self.pos = Some(self.ca_coords());
        self.x = Some(self.residue_type.iter().map(|r| r.index()).collect());
    }

    /// Computes the neighbour graph described by `spec` over CA positions,
    /// storing it under `cache` when given.
    pub fn edges(&mut self, spec: &str, cache: Option<&str>) -> Result<EdgeIndex, BatchError> {
        let spec: EdgeSpec = spec.parse()?;
        let edges = build_edges(&self.ca_coords(), &self.ptr, spec);
        debug!("Built {} edges with {:?}", edges.len(), spec);
        if let Some(name) = cache {
            self.edge_cache.insert(name.to_string(), edges.clone());
        }
        Ok(edges)
    }

    pub fn cached_edges(&self, name: &str) -> Option<&EdgeIndex> {
        self.edge_cache.get(name)
    }

    /// Slices graph `index` back out as a standalone protein.
    pub fn get_example(&self, index: usize) -> Result<Protein, BatchError> {
        let len = self.num_graphs();
        if index >= len {
            return Err(BatchError::IndexOutOfRange { index, len });
        }
        let range = self.ptr[index]..self.ptr[index + 1];
        let mut protein = Protein::new(
            self.coords[range.clone()].to_vec(),
            self.atom_mask[range.clone()].to_vec(),
            self.residue_type[range.clone()].to_vec(),
            self.residue_id[range.clone()].to_vec(),
            self.chains[range].to_vec(),
        )?;
        if let Some(targets) = self.targets.get(index) {
            protein.true_dihedrals = targets.true_dihedrals.clone();
            protein.true_residue_type = targets.true_residue_type.clone();
            protein.true_coords = targets.true_coords.clone();
        }
        Ok(protein)
    }
}
