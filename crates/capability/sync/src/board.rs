//! 看板投影：按目录分组的只读视图。

use chrono::{DateTime, Utc};
use domain::{EffectiveView, LocationRecord, Registry, Status};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodView {
    pub name: String,
    pub rooms: Vec<EffectiveView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub open: usize,
    pub closed: usize,
    pub unknown: usize,
}

impl BoardSummary {
    fn count(&mut self, status: Status) {
        match status {
            Status::Open => self.open += 1,
            Status::Closed => self.closed += 1,
            Status::Unknown => self.unknown += 1,
        }
    }
}

/// 某一时刻的看板。
///
/// 目录中的楼栋按目录顺序出现在各自社区下，缺失记录的显示默认值；
/// 不在目录中的记录按名称排序放入 `unlisted`。
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub generated_at: DateTime<Utc>,
    pub neighborhoods: Vec<NeighborhoodView>,
    pub unlisted: Vec<EffectiveView>,
    pub summary: BoardSummary,
}

impl Board {
    pub fn project(
        registry: &Registry,
        records: &BTreeMap<String, LocationRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut summary = BoardSummary::default();
        let neighborhoods = registry
            .neighborhoods()
            .iter()
            .map(|group| NeighborhoodView {
                name: group.name.clone(),
                rooms: group
                    .locations
                    .iter()
                    .map(|name| {
                        let view = match records.get(name) {
                            Some(record) => record.view_at(now),
                            None => LocationRecord::unreported(name.as_str()).view_at(now),
                        };
                        summary.count(view.effective_status);
                        view
                    })
                    .collect(),
            })
            .collect();
        let unlisted = records
            .values()
            .filter(|record| !registry.contains(&record.name))
            .map(|record| {
                let view = record.view_at(now);
                summary.count(view.effective_status);
                view
            })
            .collect();
        Self {
            generated_at: now,
            neighborhoods,
            unlisted,
            summary,
        }
    }

    /// 按名称查找（含 unlisted）。
    pub fn room(&self, name: &str) -> Option<&EffectiveView> {
        self.neighborhoods
            .iter()
            .flat_map(|group| group.rooms.iter())
            .chain(self.unlisted.iter())
            .find(|view| view.name == name)
    }
}
