#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::{PathItemType, RefOr, schema::Schema};

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            other => panic!("{name} should be an object schema, got {other:?}"),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        let components = openapi.components.as_ref().unwrap();
        for schema in [
            "ErrorResponse",
            "HealthResponse",
            "FieldViolation",
            "CreateHouseRequest",
            "UpdateHouseRequest",
            "HouseMemberUserInfo",
            "UserHouseResponse",
            "CreateExpenseRequest",
            "Frequency",
        ] {
            assert!(components.schemas.contains_key(schema), "missing {schema}");
        }

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");

        for field in ["error", "code", "violations", "success"] {
            assert!(properties.iter().any(|p| p == field), "missing {field}");
        }
    }

    #[test]
    fn test_health_response_schema_structure() {
        let properties = object_properties("HealthResponse");

        for field in ["status", "version", "database"] {
            assert!(properties.iter().any(|p| p == field), "missing {field}");
        }
    }

    #[test]
    fn test_health_endpoint_documents_degraded_status() {
        let openapi = ApiDoc::openapi();

        let health = openapi.paths.paths.get("/health").unwrap();
        let get = health.operations.get(&PathItemType::Get).unwrap();
        assert!(get.responses.responses.contains_key("200"));
        assert!(get.responses.responses.contains_key("503"));
    }

    #[test]
    fn test_house_and_member_paths_are_documented() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let expected = [
            ("/api/v1/houses", PathItemType::Post),
            ("/api/v1/houses/{house_id}", PathItemType::Patch),
            ("/api/v1/houses/{house_id}", PathItemType::Delete),
            ("/api/v1/house-members", PathItemType::Post),
            ("/api/v1/house-members/{house_member_id}", PathItemType::Patch),
            ("/api/v1/house-members/{house_member_id}", PathItemType::Delete),
            ("/api/v1/house-members/{house_id}/user-info", PathItemType::Get),
            ("/api/v1/user-houses/{user_id}", PathItemType::Get),
        ];
        for (path, method) in expected {
            let item = paths
                .get(path)
                .unwrap_or_else(|| panic!("missing path {path}"));
            assert!(item.operations.contains_key(&method), "missing {method:?} {path}");
        }
    }

    #[test]
    fn test_bearer_scheme_is_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.unwrap();

        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi = ApiDoc::openapi();
        let openapi_json = serde_json::to_string(&openapi).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
    }
}
