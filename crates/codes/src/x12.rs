//! X12 005010 code lists.

use crate::{map, CodeTable, Domain};
use canonical::{
    AdjustmentGroup, AdjustmentReason, BenefitInformation, ClaimFilingIndicator, ClaimFrequency,
    ClaimPaymentStatus, ClaimStatusCategory, ClaimType, CoverageLevel, Gender, PaymentMethod,
    PlaceOfService, Relationship, ServiceType, TimePeriod,
};

pub const PLACE_OF_SERVICE: CodeTable<PlaceOfService> = CodeTable {
    domain: Domain::PlaceOfService,
    system: "CMS-POS",
    entries: &[
        map(PlaceOfService::Telehealth, "02", "Telehealth Provided Other than in Patient's Home"),
        map(PlaceOfService::TelehealthInHome, "10", "Telehealth Provided in Patient's Home"),
        map(PlaceOfService::Office, "11", "Office"),
        map(PlaceOfService::Home, "12", "Home"),
        map(PlaceOfService::UrgentCare, "20", "Urgent Care Facility"),
        map(PlaceOfService::InpatientHospital, "21", "Inpatient Hospital"),
        map(PlaceOfService::OutpatientHospital, "22", "On Campus-Outpatient Hospital"),
        map(PlaceOfService::EmergencyRoom, "23", "Emergency Room - Hospital"),
        map(PlaceOfService::AmbulatorySurgicalCenter, "24", "Ambulatory Surgical Center"),
        map(PlaceOfService::SkilledNursingFacility, "31", "Skilled Nursing Facility"),
        map(PlaceOfService::NursingFacility, "32", "Nursing Facility"),
        map(PlaceOfService::IndependentLaboratory, "81", "Independent Laboratory"),
    ],
};

pub const CLAIM_FREQUENCY: CodeTable<ClaimFrequency> = CodeTable {
    domain: Domain::ClaimFrequency,
    system: "CLM05-3",
    entries: &[
        map(ClaimFrequency::Original, "1", "Original"),
        map(ClaimFrequency::Replacement, "7", "Replacement of Prior Claim"),
        map(ClaimFrequency::Void, "8", "Void/Cancel of Prior Claim"),
    ],
};

/// CLM05-2: how CLM05-1 is to be read.
pub const FACILITY_CODE_QUALIFIER: CodeTable<ClaimType> = CodeTable {
    domain: Domain::FacilityCodeQualifier,
    system: "CLM05-2",
    entries: &[
        map(ClaimType::Professional, "B", "Place of Service Codes for Professional or Dental Services"),
        map(ClaimType::Institutional, "A", "Uniform Billing Claim Form Bill Type"),
    ],
};

/// GS08 / ST03 implementation convention reference.
pub const IMPLEMENTATION_GUIDE: CodeTable<ClaimType> = CodeTable {
    domain: Domain::ImplementationGuide,
    system: "GS08",
    entries: &[
        map(ClaimType::Professional, "005010X222A1", "Health Care Claim: Professional"),
        map(ClaimType::Institutional, "005010X223A2", "Health Care Claim: Institutional"),
    ],
};

/// Individual relationship code (SBR02 / PAT01).
pub const RELATIONSHIP: CodeTable<Relationship> = CodeTable {
    domain: Domain::IndividualRelationship,
    system: "SBR02",
    entries: &[
        map(Relationship::SelfInsured, "18", "Self"),
        map(Relationship::Spouse, "01", "Spouse"),
        map(Relationship::Child, "19", "Child"),
        map(Relationship::Other, "G8", "Other Relationship"),
    ],
};

pub const CLAIM_FILING_INDICATOR: CodeTable<ClaimFilingIndicator> = CodeTable {
    domain: Domain::ClaimFilingIndicator,
    system: "SBR09",
    entries: &[
        map(ClaimFilingIndicator::SelfPay, "09", "Self-pay"),
        map(ClaimFilingIndicator::PreferredProviderOrganization, "12", "Preferred Provider Organization (PPO)"),
        map(ClaimFilingIndicator::PointOfService, "13", "Point of Service (POS)"),
        map(ClaimFilingIndicator::BlueCrossBlueShield, "BL", "Blue Cross/Blue Shield"),
        map(ClaimFilingIndicator::CommercialInsurance, "CI", "Commercial Insurance Co."),
        map(ClaimFilingIndicator::Tricare, "CH", "Champus"),
        map(ClaimFilingIndicator::HealthMaintenanceOrganization, "HM", "Health Maintenance Organization"),
        map(ClaimFilingIndicator::MedicarePartA, "MA", "Medicare Part A"),
        map(ClaimFilingIndicator::MedicarePartB, "MB", "Medicare Part B"),
        map(ClaimFilingIndicator::Medicaid, "MC", "Medicaid"),
        map(ClaimFilingIndicator::WorkersCompensation, "WC", "Workers' Compensation Health Claim"),
    ],
};

/// DMG03. X12 has no code for [`Gender::Other`].
pub const GENDER: CodeTable<Gender> = CodeTable {
    domain: Domain::X12Gender,
    system: "DMG03",
    entries: &[
        map(Gender::Male, "M", "Male"),
        map(Gender::Female, "F", "Female"),
        map(Gender::Unknown, "U", "Unknown"),
    ],
};

pub const SERVICE_TYPE: CodeTable<ServiceType> = CodeTable {
    domain: Domain::ServiceType,
    system: "EB03",
    entries: &[
        map(ServiceType::MedicalCare, "1", "Medical Care"),
        map(ServiceType::Surgical, "2", "Surgical"),
        map(ServiceType::Consultation, "3", "Consultation"),
        map(ServiceType::DiagnosticXRay, "4", "Diagnostic X-Ray"),
        map(ServiceType::DiagnosticLab, "5", "Diagnostic Lab"),
        map(ServiceType::HealthBenefitPlanCoverage, "30", "Health Benefit Plan Coverage"),
        map(ServiceType::Chiropractic, "33", "Chiropractic"),
        map(ServiceType::DentalCare, "35", "Dental Care"),
        map(ServiceType::HospitalInpatient, "48", "Hospital - Inpatient"),
        map(ServiceType::HospitalOutpatient, "50", "Hospital - Outpatient"),
        map(ServiceType::EmergencyServices, "86", "Emergency Services"),
        map(ServiceType::Pharmacy, "88", "Pharmacy"),
        map(ServiceType::ProfessionalOfficeVisit, "98", "Professional (Physician) Visit - Office"),
        map(ServiceType::PhysicalMedicine, "AE", "Physical Medicine"),
        map(ServiceType::Vision, "AL", "Vision (Optometry)"),
        map(ServiceType::MentalHealth, "MH", "Mental Health"),
        map(ServiceType::UrgentCare, "UC", "Urgent Care"),
    ],
};

pub const BENEFIT_INFORMATION: CodeTable<BenefitInformation> = CodeTable {
    domain: Domain::BenefitInformation,
    system: "EB01",
    entries: &[
        map(BenefitInformation::ActiveCoverage, "1", "Active Coverage"),
        map(BenefitInformation::Inactive, "6", "Inactive"),
        map(BenefitInformation::Coinsurance, "A", "Co-Insurance"),
        map(BenefitInformation::CoPayment, "B", "Co-Payment"),
        map(BenefitInformation::Deductible, "C", "Deductible"),
        map(BenefitInformation::BenefitDescription, "D", "Benefit Description"),
        map(BenefitInformation::Exclusions, "E", "Exclusions"),
        map(BenefitInformation::Limitations, "F", "Limitations"),
        map(BenefitInformation::OutOfPocket, "G", "Out of Pocket (Stop Loss)"),
        map(BenefitInformation::NonCovered, "I", "Non-Covered"),
        map(BenefitInformation::PrimaryCareProvider, "L", "Primary Care Provider"),
        map(BenefitInformation::OtherPayer, "R", "Other or Additional Payor"),
        map(BenefitInformation::CannotProcess, "V", "Cannot Process"),
    ],
};

pub const COVERAGE_LEVEL: CodeTable<CoverageLevel> = CodeTable {
    domain: Domain::CoverageLevel,
    system: "EB02",
    entries: &[
        map(CoverageLevel::Individual, "IND", "Individual"),
        map(CoverageLevel::Family, "FAM", "Family"),
        map(CoverageLevel::EmployeeOnly, "EMP", "Employee Only"),
        map(CoverageLevel::EmployeeAndSpouse, "ESP", "Employee and Spouse"),
        map(CoverageLevel::EmployeeAndChildren, "ECH", "Employee and Children"),
        map(CoverageLevel::ChildrenOnly, "CHD", "Children Only"),
    ],
};

pub const TIME_PERIOD: CodeTable<TimePeriod> = CodeTable {
    domain: Domain::TimePeriod,
    system: "EB06",
    entries: &[
        map(TimePeriod::Day, "7", "Day"),
        map(TimePeriod::ServiceYear, "22", "Service Year"),
        map(TimePeriod::CalendarYear, "23", "Calendar Year"),
        map(TimePeriod::YearToDate, "24", "Year to Date"),
        map(TimePeriod::Contract, "25", "Contract"),
        map(TimePeriod::Episode, "26", "Episode"),
        map(TimePeriod::Visit, "27", "Visit"),
        map(TimePeriod::Remaining, "29", "Remaining"),
        map(TimePeriod::Lifetime, "32", "Lifetime"),
        map(TimePeriod::LifetimeRemaining, "33", "Lifetime Remaining"),
        map(TimePeriod::Month, "34", "Month"),
        map(TimePeriod::Admission, "36", "Admission"),
    ],
};

pub const CLAIM_STATUS_CATEGORY: CodeTable<ClaimStatusCategory> = CodeTable {
    domain: Domain::ClaimStatusCategory,
    system: "STC01-1",
    entries: &[
        map(ClaimStatusCategory::Forwarded, "A0", "Acknowledgement/Forwarded"),
        map(ClaimStatusCategory::Acknowledged, "A1", "Acknowledgement/Receipt"),
        map(ClaimStatusCategory::AcceptedIntoAdjudication, "A2", "Acknowledgement/Acceptance into adjudication system"),
        map(ClaimStatusCategory::ReturnedUnprocessable, "A3", "Acknowledgement/Returned as unprocessable claim"),
        map(ClaimStatusCategory::NotFound, "A4", "Acknowledgement/Not Found"),
        map(ClaimStatusCategory::SplitClaim, "A5", "Acknowledgement/Split Claim"),
        map(ClaimStatusCategory::MissingInformation, "A6", "Acknowledgement/Rejected for Missing Information"),
        map(ClaimStatusCategory::InvalidInformation, "A7", "Acknowledgement/Rejected for Invalid Information"),
        map(ClaimStatusCategory::RelationalFieldError, "A8", "Acknowledgement/Rejected for relational field in error"),
        map(ClaimStatusCategory::PendingAdjudication, "P0", "Pending: Adjudication/Details"),
        map(ClaimStatusCategory::PendingInProcess, "P1", "Pending/In Process"),
        map(ClaimStatusCategory::PendingPayerReview, "P2", "Pending/Payer Review"),
        map(ClaimStatusCategory::PendingProviderInformation, "P3", "Pending/Provider Requested Information"),
        map(ClaimStatusCategory::PendingPatientInformation, "P4", "Pending/Patient Requested Information"),
        map(ClaimStatusCategory::Finalized, "F0", "Finalized"),
        map(ClaimStatusCategory::FinalizedPayment, "F1", "Finalized/Payment"),
        map(ClaimStatusCategory::FinalizedDenial, "F2", "Finalized/Denial"),
        map(ClaimStatusCategory::FinalizedRevised, "F3", "Finalized/Revised"),
        map(ClaimStatusCategory::FinalizedNoPayment, "F4", "Finalized/Adjudication Complete - No Payment Forthcoming"),
        map(ClaimStatusCategory::RequestForInformation, "R0", "Requests for additional Information/General Requests"),
        map(ClaimStatusCategory::ResponseNotPossible, "E0", "Response not possible - error on submitted request data"),
        map(ClaimStatusCategory::SystemUnavailable, "E1", "Response not possible - System Status"),
    ],
};

pub const CLAIM_PAYMENT_STATUS: CodeTable<ClaimPaymentStatus> = CodeTable {
    domain: Domain::ClaimPaymentStatus,
    system: "CLP02",
    entries: &[
        map(ClaimPaymentStatus::ProcessedAsPrimary, "1", "Processed as Primary"),
        map(ClaimPaymentStatus::ProcessedAsSecondary, "2", "Processed as Secondary"),
        map(ClaimPaymentStatus::ProcessedAsTertiary, "3", "Processed as Tertiary"),
        map(ClaimPaymentStatus::Denied, "4", "Denied"),
        map(ClaimPaymentStatus::ProcessedAsPrimaryForwarded, "19", "Processed as Primary, Forwarded to Additional Payer(s)"),
        map(ClaimPaymentStatus::ProcessedAsSecondaryForwarded, "20", "Processed as Secondary, Forwarded to Additional Payer(s)"),
        map(ClaimPaymentStatus::ProcessedAsTertiaryForwarded, "21", "Processed as Tertiary, Forwarded to Additional Payer(s)"),
        map(ClaimPaymentStatus::Reversal, "22", "Reversal of Previous Payment"),
        map(ClaimPaymentStatus::NotOurClaimForwarded, "23", "Not Our Claim, Forwarded to Additional Payer(s)"),
        map(ClaimPaymentStatus::PredeterminationPricingOnly, "25", "Predetermination Pricing Only - No Payment"),
    ],
};

pub const ADJUSTMENT_GROUP: CodeTable<AdjustmentGroup> = CodeTable {
    domain: Domain::AdjustmentGroup,
    system: "CAGC",
    entries: &[
        map(AdjustmentGroup::ContractualObligation, "CO", "Contractual Obligations"),
        map(AdjustmentGroup::Correction, "CR", "Corrections and Reversals"),
        map(AdjustmentGroup::OtherAdjustment, "OA", "Other adjustments"),
        map(AdjustmentGroup::PayerInitiated, "PI", "Payor Initiated Reductions"),
        map(AdjustmentGroup::PatientResponsibility, "PR", "Patient Responsibility"),
    ],
};

pub const ADJUSTMENT_REASON: CodeTable<AdjustmentReason> = CodeTable {
    domain: Domain::AdjustmentReason,
    system: "CARC",
    entries: &[
        map(AdjustmentReason::Deductible, "1", "Deductible Amount"),
        map(AdjustmentReason::Coinsurance, "2", "Coinsurance Amount"),
        map(AdjustmentReason::Copayment, "3", "Co-payment Amount"),
        map(AdjustmentReason::ModifierInconsistent, "4", "The procedure code is inconsistent with the modifier used"),
        map(AdjustmentReason::MissingInformation, "16", "Claim/service lacks information or has submission/billing error(s)"),
        map(AdjustmentReason::DuplicateClaim, "18", "Exact duplicate claim/service"),
        map(AdjustmentReason::CoveredByAnotherPayer, "22", "This care may be covered by another payer per coordination of benefits"),
        map(AdjustmentReason::CoverageTerminated, "27", "Expenses incurred after coverage terminated"),
        map(AdjustmentReason::TimelyFilingExpired, "29", "The time limit for filing has expired"),
        map(AdjustmentReason::PatientNotIdentified, "31", "Patient cannot be identified as our insured"),
        map(AdjustmentReason::ChargeExceedsFeeSchedule, "45", "Charge exceeds fee schedule/maximum allowable"),
        map(AdjustmentReason::NotMedicallyNecessary, "50", "These are non-covered services because this is not deemed a 'medical necessity' by the payer"),
        map(AdjustmentReason::NotCovered, "96", "Non-covered charge(s)"),
        map(AdjustmentReason::Bundled, "97", "The benefit for this service is included in the payment/allowance for another service"),
        map(AdjustmentReason::BenefitMaximumReached, "119", "Benefit maximum for this time period or occurrence has been reached"),
        map(AdjustmentReason::PriorAuthorizationAbsent, "197", "Precertification/authorization/notification/pre-treatment absent"),
        map(AdjustmentReason::NotCoveredByPlan, "204", "This service/equipment/drug is not covered under the patient's current benefit plan"),
        map(AdjustmentReason::Sequestration, "253", "Sequestration - reduction in federal payment"),
    ],
};

pub const PAYMENT_METHOD: CodeTable<PaymentMethod> = CodeTable {
    domain: Domain::PaymentMethod,
    system: "BPR04",
    entries: &[
        map(PaymentMethod::Ach, "ACH", "Automated Clearing House"),
        map(PaymentMethod::FinancialInstitutionOption, "BOP", "Financial Institution Option"),
        map(PaymentMethod::Check, "CHK", "Check"),
        map(PaymentMethod::Wire, "FWT", "Federal Reserve Funds/Wire Transfer"),
        map(PaymentMethod::NonPayment, "NON", "Non-Payment Data"),
    ],
};
