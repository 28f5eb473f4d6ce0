pub mod accounts;
pub mod catalog;
pub mod certificate;
pub mod enrollment_store;

pub use accounts::{Accounts, HistoryEntry, Profile};
pub use catalog::{Catalog, CourseDetail, CourseFilter, CourseSummary, Facets, MyCourses};
pub use certificate::{Certificate, CertificateQuery, resolve_certificate};
pub use enrollment_store::{Enrolled, EnrollmentEvent, EnrollmentStore};
