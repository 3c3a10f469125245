pub mod content_postgres_repository;
pub mod jwt_authentication_repository;
pub mod share_link_postgres_repository;
pub mod user_postgres_repository;
pub mod vector_record_qdrant_repository;
