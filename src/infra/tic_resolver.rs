use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

use crate::app::ports::{CoordinateQuery, ResolverHit, StarResolverPort};
use crate::error::Result;
use crate::infra::http_client::{cone_condition, TapClient, TapTable};
use crate::infra::simbad_resolver::assign_cone_hits;

/// Photometric-survey resolver: the TESS Input Catalog through VizieR TAP
pub struct TicResolver {
    tap: TapClient,
    table: String,
}

/// Numeric TIC id from `TIC 123`, `TIC-123` or `TIC123`
pub fn tic_number(identifier: &str) -> Option<u64> {
    let rest = identifier.trim();
    let rest = rest.get(..3).filter(|p| p.eq_ignore_ascii_case("TIC")).map(|_| &rest[3..])?;
    rest.trim_start_matches([' ', '-']).parse().ok()
}

impl TicResolver {
    pub fn new(endpoint: &str, table: &str, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            tap: TapClient::new(endpoint, timeout_seconds)?,
            table: table.to_string(),
        })
    }

    fn hits_from(table: &TapTable) -> Vec<(u64, ResolverHit)> {
        let tic = table.column("TIC");
        let ra = table.column("RAJ2000");
        let dec = table.column("DEJ2000");
        table
            .data
            .iter()
            .filter_map(|row| {
                let number: u64 = TapTable::text(row, tic)?.parse().ok()?;
                let main_id = format!("TIC {}", number);
                Some((
                    number,
                    ResolverHit {
                        input_key: String::new(),
                        main_id: main_id.clone(),
                        ra: TapTable::float(row, ra),
                        dec: TapTable::float(row, dec),
                        cross_ids: vec![main_id],
                    },
                ))
            })
            .collect()
    }
}

#[async_trait]
impl StarResolverPort for TicResolver {
    fn service_name(&self) -> &str {
        "TIC"
    }

    async fn ping(&self) -> std::result::Result<(), String> {
        self.tap
            .query(&format!("SELECT TOP 1 TIC FROM \"{}\"", self.table))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn resolve_by_name(&self, identifiers: &[String]) -> std::result::Result<Vec<ResolverHit>, String> {
        let mut wanted: BTreeMap<u64, Vec<&String>> = BTreeMap::new();
        for identifier in identifiers {
            if let Some(number) = tic_number(identifier) {
                wanted.entry(number).or_default().push(identifier);
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let list = wanted.keys().map(|n| n.to_string()).collect::<Vec<_>>().join(", ");
        let adql = format!("SELECT TIC, RAJ2000, DEJ2000 FROM \"{}\" WHERE TIC IN ({})", self.table, list);
        let table = self.tap.query(&adql).await.map_err(|e| e.to_string())?;

        let mut hits = Vec::new();
        for (number, hit) in Self::hits_from(&table) {
            for identifier in wanted.get(&number).into_iter().flatten() {
                hits.push(ResolverHit {
                    input_key: (*identifier).clone(),
                    ..hit.clone()
                });
            }
        }
        info!("TIC name batch: {} identifiers, {} hits", wanted.len(), hits.len());
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
        let positions: Vec<(f64, f64)> = queries.iter().map(|q| (q.ra, q.dec)).collect();
        let adql = format!(
            "SELECT TIC, RAJ2000, DEJ2000 FROM \"{}\" WHERE {}",
            self.table,
            cone_condition("RAJ2000", "DEJ2000", &positions, radius_deg)
        );
        let table = self.tap.query(&adql).await.map_err(|e| e.to_string())?;
        let stars: Vec<ResolverHit> = Self::hits_from(&table).into_iter().map(|(_, hit)| hit).collect();
        let hits = assign_cone_hits(queries, &stars, radius_deg);
        info!("TIC cone batch: {} positions, {} hits", queries.len(), hits.len());
        Ok(hits)
    }
}
