//! Eligibility inquiry (270) and response (271).

use crate::common::{Payer, Person, Provider, Subscriber};
use chrono::NaiveDate;
use medwire_types::{Coded, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Service type code (EQ01 / EB03).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    MedicalCare,
    Surgical,
    Consultation,
    DiagnosticXRay,
    DiagnosticLab,
    HealthBenefitPlanCoverage,
    Chiropractic,
    DentalCare,
    HospitalInpatient,
    HospitalOutpatient,
    EmergencyServices,
    Pharmacy,
    ProfessionalOfficeVisit,
    PhysicalMedicine,
    Vision,
    MentalHealth,
    UrgentCare,
}

/// Eligibility or benefit information code (EB01).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitInformation {
    ActiveCoverage,
    Inactive,
    Coinsurance,
    CoPayment,
    Deductible,
    BenefitDescription,
    Exclusions,
    Limitations,
    OutOfPocket,
    NonCovered,
    PrimaryCareProvider,
    OtherPayer,
    CannotProcess,
}

/// Coverage level code (EB02).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    Individual,
    Family,
    EmployeeOnly,
    EmployeeAndSpouse,
    EmployeeAndChildren,
    ChildrenOnly,
}

impl CoverageLevel {
    pub fn is_individual(self) -> bool {
        matches!(self, CoverageLevel::Individual | CoverageLevel::EmployeeOnly)
    }
}

/// Time period qualifier (EB06).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Day,
    ServiceYear,
    CalendarYear,
    YearToDate,
    Contract,
    Episode,
    Visit,
    Remaining,
    Lifetime,
    LifetimeRemaining,
    Month,
    Admission,
}

impl TimePeriod {
    /// Amount is the full benefit for the period.
    pub fn is_total(self) -> bool {
        matches!(
            self,
            TimePeriod::ServiceYear
                | TimePeriod::CalendarYear
                | TimePeriod::Contract
                | TimePeriod::Lifetime
        )
    }

    /// Amount is what is left of the benefit.
    pub fn is_remaining(self) -> bool {
        matches!(self, TimePeriod::Remaining | TimePeriod::LifetimeRemaining)
    }
}

/// An eligibility inquiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRequest {
    /// Trace number echoed back in the 271.
    pub id: String,
    pub subscriber: Subscriber,
    /// Set when the patient is not the subscriber.
    pub dependent: Option<Person>,
    pub provider: Provider,
    pub payer: Payer,
    #[serde(default)]
    pub service_types: Vec<ServiceType>,
    pub service_date: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Amounts {
    pub total: Option<Money>,
    pub remaining: Option<Money>,
}

/// Individual and family amounts for one accumulator (deductible or out-of-pocket).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Accumulator {
    pub individual: Amounts,
    pub family: Amounts,
}

/// Benefits reported for one service type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CoverageDetail {
    pub service_type: Coded<ServiceType>,
    pub active: Option<bool>,
    pub in_network: Option<bool>,
    pub deductible: Accumulator,
    pub out_of_pocket: Accumulator,
    pub copay: Option<Money>,
    /// Coinsurance as a fraction, `0.2` for 20%.
    pub coinsurance: Option<Decimal>,
    pub limitations: Vec<String>,
    pub messages: Vec<String>,
}

impl CoverageDetail {
    pub fn new(service_type: Coded<ServiceType>) -> Self {
        Self {
            service_type,
            active: None,
            in_network: None,
            deductible: Accumulator::default(),
            out_of_pocket: Accumulator::default(),
            copay: None,
            coinsurance: None,
            limitations: Vec::new(),
            messages: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Active,
    Inactive,
    #[default]
    Undetermined,
}

/// A request validation failure reported by the payer (AAA).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestRejection {
    /// Loop the AAA segment appeared in.
    pub level: String,
    pub reason_code: String,
    pub follow_up: Option<String>,
}

/// A parsed 271.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EligibilityResponse {
    pub trace_number: Option<String>,
    pub payer_id: Option<String>,
    pub payer_name: Option<String>,
    pub provider_npi: Option<String>,
    pub provider_name: Option<String>,
    pub subscriber: Option<Subscriber>,
    pub dependent: Option<Person>,
    pub eligible: bool,
    pub coverage_status: CoverageStatus,
    pub plan_description: Option<String>,
    pub coverage: Vec<CoverageDetail>,
    pub rejections: Vec<RequestRejection>,
}

impl EligibilityResponse {
    pub fn coverage_for(&self, service_type: ServiceType) -> Option<&CoverageDetail> {
        self.coverage
            .iter()
            .find(|detail| detail.service_type.known() == Some(&service_type))
    }
}
