//! 楼栋目录。
//!
//! 静态、只读，启动时构建一次。定义合法 location 名称的全集，并按社区分组
//! 保持展示顺序。

use std::collections::HashSet;

/// 社区及其下属楼栋（有序）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    pub name: String,
    pub locations: Vec<String>,
}

/// 楼栋目录。
#[derive(Debug, Clone)]
pub struct Registry {
    neighborhoods: Vec<Neighborhood>,
    names: HashSet<String>,
}

impl Registry {
    /// 按给定顺序构建目录。
    ///
    /// 同名楼栋只保留第一次出现的位置；空白名称被忽略。
    pub fn new<N, L>(groups: impl IntoIterator<Item = (N, Vec<L>)>) -> Self
    where
        N: Into<String>,
        L: Into<String>,
    {
        let mut names = HashSet::new();
        let mut neighborhoods = Vec::new();
        for (name, locations) in groups {
            let mut kept = Vec::with_capacity(locations.len());
            for location in locations {
                let location: String = location.into();
                let location = location.trim().to_string();
                if location.is_empty() || !names.insert(location.clone()) {
                    continue;
                }
                kept.push(location);
            }
            neighborhoods.push(Neighborhood {
                name: name.into(),
                locations: kept,
            });
        }
        Self {
            neighborhoods,
            names,
        }
    }

    /// 参考部署的默认目录。
    pub fn campus_default() -> Self {
        Self::new([
            (
                "East Neighborhood",
                vec![
                    "DellPlain Hall",
                    "Ernie Davis Hall",
                    "Oren Lyons Hall",
                    "Shaw Hall",
                    "Watson Hall",
                ],
            ),
            ("Mount Olympus Neighborhood", vec!["Day Hall", "Flint Hall"]),
            (
                "North Neighborhood",
                vec![
                    "Booth Hall",
                    "Haven Hall",
                    "Milton Hall",
                    "Orange Hall",
                    "Walnut Hall",
                    "Washington Arms Hall",
                ],
            ),
            (
                "West Neighborhood",
                vec![
                    "Boland Hall",
                    "Brewster Hall",
                    "Brockway Hall",
                    "Lawrinson Hall",
                    "Sadler Hall",
                ],
            ),
        ])
    }

    pub fn neighborhoods(&self) -> &[Neighborhood] {
        &self.neighborhoods
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// 所有楼栋名称（按目录顺序）。
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.neighborhoods
            .iter()
            .flat_map(|group| group.locations.iter().map(String::as_str))
    }

    pub fn neighborhood_of(&self, name: &str) -> Option<&str> {
        self.neighborhoods
            .iter()
            .find(|group| group.locations.iter().any(|location| location == name))
            .map(|group| group.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
