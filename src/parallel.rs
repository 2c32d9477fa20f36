//! Searching one pattern across many molecules.
//!
//! With the `parallel` feature (default) the molecules are spread over the
//! rayon thread pool. Without it a serial shim exposes the same `par_iter`
//! call, so [`search_batch`] is written once.

use tracing::{debug, instrument};

use crate::config::SearchOptions;
use crate::error::Result;
use crate::molecule::Molecule;
use crate::pattern::QueryGraph;
use crate::substruct::{MatchResult, search_with};

#[cfg(feature = "parallel")]
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

#[cfg(not(feature = "parallel"))]
use self::serial::IntoParallelRefIterator;

#[cfg(not(feature = "parallel"))]
mod serial {
    /// Stand-in for rayon's `par_iter()` on anything iterable by reference.
    pub trait IntoParallelRefIterator<'data> {
        type Item;
        type Iter: Iterator<Item = Self::Item>;
        fn par_iter(&'data self) -> Self::Iter;
    }

    impl<'data, I: 'data + ?Sized> IntoParallelRefIterator<'data> for I
    where
        &'data I: IntoIterator,
    {
        type Item = <&'data I as IntoIterator>::Item;
        type Iter = <&'data I as IntoIterator>::IntoIter;
        fn par_iter(&'data self) -> Self::Iter {
            self.into_iter()
        }
    }
}

/// Runs [`search_with`] for every molecule. Results are returned in input
/// order; a failure on one molecule does not affect the others.
///
/// # Examples
///
/// ```
/// use chemical_perception::{build_molecule, from_smarts, search_batch, SearchOptions, ToolkitMol};
///
/// let mols: Vec<_> = ["CO", "CC", "OCCO"]
///     .iter()
///     .map(|s| build_molecule(&mut ToolkitMol::from_smiles(s).unwrap()).unwrap())
///     .collect();
/// let pattern = from_smarts("[#8:1]").unwrap();
/// let counts: Vec<usize> = search_batch(&mols, &pattern, &SearchOptions::default())
///     .into_iter()
///     .map(|r| r.unwrap().len())
///     .collect();
/// assert_eq!(counts, [1, 0, 2]);
/// ```
#[instrument(skip_all, fields(molecules = mols.len()))]
pub fn search_batch(
    mols: &[Molecule],
    pattern: &QueryGraph,
    options: &SearchOptions,
) -> Vec<Result<Vec<MatchResult>>> {
    let results: Vec<_> = mols
        .par_iter()
        .map(|mol| search_with(mol, pattern, options))
        .collect();
    debug!(
        failed = results.iter().filter(|r| r.is_err()).count(),
        "Batch search complete."
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PerceptionError;
    use crate::molecule::build_molecule;
    use crate::smarts::from_smarts;
    use crate::toolkit::ToolkitMol;

    fn mol(smiles: &str) -> Molecule {
        let mut tk = ToolkitMol::from_smiles(smiles).unwrap();
        build_molecule(&mut tk).unwrap()
    }

    #[test]
    fn preserves_input_order() {
        let mols: Vec<Molecule> = ["C", "CCO", "c1ccccc1", "OCCO", "N"]
            .into_iter()
            .map(mol)
            .collect();
        let pattern = from_smarts("[#6:1]").unwrap();
        let counts: Vec<usize> = search_batch(&mols, &pattern, &SearchOptions::default())
            .into_iter()
            .map(|r| r.unwrap().len())
            .collect();
        assert_eq!(counts, [1, 2, 6, 2, 0]);
    }

    #[test]
    fn agrees_with_single_search() {
        let mols: Vec<Molecule> = ["CC(=O)O", "OC(=O)CC(=O)O"].into_iter().map(mol).collect();
        let pattern = from_smarts("[#6:1](=[#8:2])-[#8:3]").unwrap();
        let batch = search_batch(&mols, &pattern, &SearchOptions::default());
        for (m, r) in mols.iter().zip(batch) {
            assert_eq!(r.unwrap(), search_with(m, &pattern, &SearchOptions::default()).unwrap());
        }
    }

    #[test]
    fn errors_stay_per_molecule() {
        let mols: Vec<Molecule> = ["C", "CCCCCCCC"].into_iter().map(mol).collect();
        let pattern = from_smarts("[#6:1]~[#6:2]~[#6:3]").unwrap();
        let options = SearchOptions::new().with_step_budget(5);
        let results = search_batch(&mols, &pattern, &options);
        assert_eq!(results[0].as_ref().unwrap().len(), 0);
        assert!(matches!(
            results[1],
            Err(PerceptionError::SearchBudgetExceeded { budget: 5 })
        ));
    }

    #[test]
    fn empty_batch() {
        let pattern = from_smarts("[#6]").unwrap();
        assert!(search_batch(&[], &pattern, &SearchOptions::default()).is_empty());
    }
}
