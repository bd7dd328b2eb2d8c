use serde::Serialize;

use crate::models::{RouteSeed, VehicleCategory};

#[derive(Debug, Clone, Serialize)]
pub struct FleetEntry {
    pub category: VehicleCategory,
    pub capacity: u8,
    pub title_key: String,
    pub models: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub id: &'static str,
    pub name_key: &'static str,
    pub from: &'static str,
    pub to: &'static str,
    pub duration: &'static str,
    pub price_som: u32,
    pub distance_km: u32,
    pub popular: bool,
}

impl Route {
    pub fn seed(&self) -> RouteSeed {
        RouteSeed {
            from: self.from.to_string(),
            to: self.to.to_string(),
        }
    }

    pub fn description_key(&self) -> String {
        format!("routes.{}_description", self.name_key.trim_start_matches("routes."))
    }
}

const ROUTES: [Route; 6] = [
    Route {
        id: "bishkek-almaty",
        name_key: "routes.bishkek_almaty",
        from: "Bishkek",
        to: "Almaty",
        duration: "3.5h",
        price_som: 7_000,
        distance_km: 235,
        popular: true,
    },
    Route {
        id: "almaty-bishkek",
        name_key: "routes.almaty_bishkek",
        from: "Almaty",
        to: "Bishkek",
        duration: "3.5h",
        price_som: 7_000,
        distance_km: 235,
        popular: true,
    },
    Route {
        id: "bishkek-issykkul",
        name_key: "routes.bishkek_issykkul",
        from: "Bishkek",
        to: "Issyk-Kul",
        duration: "3h",
        price_som: 3_500,
        distance_km: 250,
        popular: true,
    },
    Route {
        id: "almaty-issykkul",
        name_key: "routes.almaty_issykkul",
        from: "Almaty",
        to: "Issyk-Kul",
        duration: "5h",
        price_som: 12_000,
        distance_km: 400,
        popular: true,
    },
    Route {
        id: "bishkek-osh",
        name_key: "routes.bishkek_osh",
        from: "Bishkek",
        to: "Osh",
        duration: "9h",
        price_som: 12_000,
        distance_km: 700,
        popular: false,
    },
    Route {
        id: "bishkek-talas",
        name_key: "routes.bishkek_talas",
        from: "Bishkek",
        to: "Talas",
        duration: "4h",
        price_som: 8_000,
        distance_km: 300,
        popular: false,
    },
];

pub fn routes() -> &'static [Route] {
    &ROUTES
}

pub fn popular_routes() -> impl Iterator<Item = &'static Route> {
    ROUTES.iter().filter(|route| route.popular)
}

pub fn find_route(id: &str) -> Option<&'static Route> {
    let id = id.trim().to_lowercase();
    ROUTES.iter().find(|route| route.id == id)
}

pub fn fleet() -> Vec<FleetEntry> {
    VehicleCategory::ALL
        .into_iter()
        .map(|category| FleetEntry {
            category,
            capacity: category.capacity(),
            title_key: category.title_key(),
            models: models_for(category).to_vec(),
        })
        .collect()
}

fn models_for(category: VehicleCategory) -> &'static [&'static str] {
    match category {
        VehicleCategory::Sedan => &[
            "HYUNDAI SONATA DN8",
            "HYUNDAI SONATA NEW RISE",
            "HYUNDAI GRANDEUR",
            "KIA K5",
            "KIA K7",
            "TOYOTA CAMRY",
        ],
        VehicleCategory::Minivan => &[
            "TOYOTA ALPHARD",
            "TOYOTA VELLFIRE",
            "KIA CARNIVAL",
            "HYUNDAI STAREX",
            "HYUNDAI STARIA",
        ],
        VehicleCategory::Suv => &["LEXUS 570"],
        VehicleCategory::Premium => &["MERCEDES-BENZ 221/222/223", "MERCEDES-BENZ MAYBACH"],
        VehicleCategory::Sprinter => &["MERCEDES-BENZ SPRINTER H2 L3", "MERCEDES-BENZ SPRINTER REX"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_lookup_is_case_insensitive() {
        let route = find_route(" Bishkek-Osh ").expect("route should exist");
        assert_eq!(route.seed().to, "Osh");
        assert!(find_route("bishkek-moscow").is_none());
    }

    #[test]
    fn home_page_shows_four_popular_routes() {
        let ids = popular_routes().map(|route| route.id).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec!["bishkek-almaty", "almaty-bishkek", "bishkek-issykkul", "almaty-issykkul"]
        );
    }

    #[test]
    fn fleet_lists_every_category_with_models() {
        let fleet = fleet();
        assert_eq!(fleet.len(), VehicleCategory::ALL.len());
        assert!(fleet.iter().all(|entry| !entry.models.is_empty()));
        let sprinter = fleet
            .iter()
            .find(|entry| entry.category == VehicleCategory::Sprinter)
            .unwrap();
        assert_eq!(sprinter.capacity, 18);
        assert_eq!(sprinter.title_key, "vehicles.sprinter_title");
    }
}
