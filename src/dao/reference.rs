use super::record::{
    decode_category, decode_measurable, decode_scheme, encode_category, encode_measurable,
    encode_scheme,
};
use crate::connection::Reader;
use crate::core::{Result, Value};
use crate::model::{AllocationScheme, Measurable, MeasurableCategory};
use crate::storage::schema::{allocation_scheme, measurable, measurable_category};
use crate::transaction::Transaction;

/// Pass-through access to schemes, categories and measurables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceDao;

impl ReferenceDao {
    pub fn new() -> Self {
        Self
    }

    pub fn create_category(&self, tx: &mut Transaction<'_>, category: &MeasurableCategory) -> Result<()> {
        tx.insert(measurable_category::TABLE, encode_category(category))?;
        Ok(())
    }

    pub fn create_measurable(&self, tx: &mut Transaction<'_>, m: &Measurable) -> Result<()> {
        tx.insert(measurable::TABLE, encode_measurable(m))?;
        Ok(())
    }

    pub fn create_scheme(&self, tx: &mut Transaction<'_>, scheme: &AllocationScheme) -> Result<()> {
        tx.insert(allocation_scheme::TABLE, encode_scheme(scheme))?;
        Ok(())
    }

    pub fn find_category<R: Reader>(&self, reader: &R, id: i64) -> Result<Option<MeasurableCategory>> {
        reader
            .select(
                measurable_category::TABLE,
                &[(measurable_category::ID, Value::Integer(id))],
            )?
            .first()
            .map(|(_, row)| decode_category(row))
            .transpose()
    }

    pub fn find_scheme<R: Reader>(&self, reader: &R, id: i64) -> Result<Option<AllocationScheme>> {
        reader
            .select(
                allocation_scheme::TABLE,
                &[(allocation_scheme::ID, Value::Integer(id))],
            )?
            .first()
            .map(|(_, row)| decode_scheme(row))
            .transpose()
    }

    pub fn find_measurables_by_category<R: Reader>(&self, reader: &R, category_id: i64) -> Result<Vec<Measurable>> {
        let mut measurables = reader
            .select(
                measurable::TABLE,
                &[(measurable::CATEGORY_ID, Value::Integer(category_id))],
            )?
            .iter()
            .map(|(_, row)| decode_measurable(row))
            .collect::<Result<Vec<_>>>()?;
        measurables.sort_by_key(|m| m.id);
        Ok(measurables)
    }
}
