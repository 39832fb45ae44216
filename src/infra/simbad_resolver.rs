use async_trait::async_trait;
use tracing::info;

use crate::app::ports::{CoordinateQuery, ResolverHit, StarResolverPort};
use crate::error::Result;
use crate::infra::http_client::{adql_literal, cone_condition, TapClient, TapTable};
use crate::pipeline::processing::coordinates::separation;

/// Star-database resolver backed by the SIMBAD TAP service
pub struct SimbadResolver {
    tap: TapClient,
}

impl SimbadResolver {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            tap: TapClient::new(endpoint, timeout_seconds)?,
        })
    }

    pub fn name_query(identifiers: &[String]) -> String {
        let list = identifiers.iter().map(|id| adql_literal(id)).collect::<Vec<_>>().join(", ");
        format!(
            "SELECT i.id AS input_key, b.main_id, b.ra, b.dec, s.ids \
             FROM ident AS i JOIN basic AS b ON b.oid = i.oidref JOIN ids AS s ON s.oidref = b.oid \
             WHERE i.id IN ({})",
            list
        )
    }

    pub fn cone_query(queries: &[CoordinateQuery], radius_deg: f64) -> String {
        let positions: Vec<(f64, f64)> = queries.iter().map(|q| (q.ra, q.dec)).collect();
        format!(
            "SELECT b.main_id, b.ra, b.dec, s.ids \
             FROM basic AS b JOIN ids AS s ON s.oidref = b.oid \
             WHERE {}",
            cone_condition("b.ra", "b.dec", &positions, radius_deg)
        )
    }

    fn hits_from(table: &TapTable, input_key: Option<&str>) -> Vec<ResolverHit> {
        let key = table.column("input_key");
        let main_id = table.column("main_id");
        let ra = table.column("ra");
        let dec = table.column("dec");
        let ids = table.column("ids");
        table
            .data
            .iter()
            .filter_map(|row| {
                Some(ResolverHit {
                    input_key: input_key.map(str::to_string).or_else(|| TapTable::text(row, key))?,
                    main_id: TapTable::text(row, main_id)?,
                    ra: TapTable::float(row, ra),
                    dec: TapTable::float(row, dec),
                    cross_ids: TapTable::text(row, ids)
                        .map(|list| list.split('|').map(|id| id.trim().to_string()).filter(|id| !id.is_empty()).collect())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// Pairs each query with every returned star inside its cone, nearest first
pub fn assign_cone_hits(queries: &[CoordinateQuery], stars: &[ResolverHit], radius_deg: f64) -> Vec<ResolverHit> {
    let mut hits = Vec::new();
    for query in queries {
        let mut inside: Vec<(f64, &ResolverHit)> = stars
            .iter()
            .filter_map(|star| {
                let sep = separation((Some(query.ra), Some(query.dec)), (star.ra, star.dec))?;
                Some((sep, star)).filter(|(sep, _)| *sep <= radius_deg)
            })
            .collect();
        inside.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.extend(inside.into_iter().map(|(_, star)| ResolverHit {
            input_key: query.key.clone(),
            ..star.clone()
        }));
    }
    hits
}

#[async_trait]
impl StarResolverPort for SimbadResolver {
    fn service_name(&self) -> &str {
        "SIMBAD"
    }

    async fn ping(&self) -> std::result::Result<(), String> {
        self.tap
            .query("SELECT TOP 1 main_id FROM basic")
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn resolve_by_name(&self, identifiers: &[String]) -> std::result::Result<Vec<ResolverHit>, String> {
        let usable: Vec<String> = identifiers.iter().filter(|id| id.is_ascii() && !id.trim().is_empty()).cloned().collect();
        if usable.is_empty() {
            return Ok(Vec::new());
        }
        let table = self
            .tap
            .query(&Self::name_query(&usable))
            .await
            .map_err(|e| e.to_string())?;
        let hits = Self::hits_from(&table, None);
        info!("SIMBAD name batch: {} identifiers, {} hits", usable.len(), hits.len());
        Ok(hits)
    }

    async fn resolve_by_coordinates(
        &self,
        queries: &[CoordinateQuery],
        radius_deg: f64,
    ) -> std::result::Result<Vec<ResolverHit>, String> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let table = self
            .tap
            .query(&Self::cone_query(queries, radius_deg))
            .await
            .map_err(|e| e.to_string())?;
        let stars = Self::hits_from(&table, Some(""));
        let hits = assign_cone_hits(queries, &stars, radius_deg);
        info!("SIMBAD cone batch: {} positions, {} hits", queries.len(), hits.len());
        Ok(hits)
    }
}
