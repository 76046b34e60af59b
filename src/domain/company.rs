use serde::{Deserialize, Serialize};

/// Issuer details printed on every quote and invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub legal_status: String,
    pub siren: String,
    pub vat_number: String,
    pub bank_name: String,
    pub iban: String,
    pub bic: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "CREATIVINDUSTRY".to_string(),
            address: "15 RUE AUGER, 13004 MARSEILLE 4 - France".to_string(),
            email: "CONTACT@CREATIVINDUSTRY.COM".to_string(),
            phone: "06 68 89 69 96".to_string(),
            legal_status: "Entrepreneur individuel".to_string(),
            siren: "951.984.111".to_string(),
            vat_number: "FR66951984111".to_string(),
            bank_name: "QONTO".to_string(),
            iban: "FR7616958000010827407974101".to_string(),
            bic: "QNTOFRP1XXX".to_string(),
        }
    }
}

/// Partial update; `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct CompanyProfileUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub legal_status: Option<String>,
    pub siren: Option<String>,
    pub vat_number: Option<String>,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
}

impl CompanyProfile {
    pub fn apply(&mut self, update: CompanyProfileUpdate) {
        let fields = [
            (&mut self.name, update.name),
            (&mut self.address, update.address),
            (&mut self.email, update.email),
            (&mut self.phone, update.phone),
            (&mut self.legal_status, update.legal_status),
            (&mut self.siren, update.siren),
            (&mut self.vat_number, update.vat_number),
            (&mut self.bank_name, update.bank_name),
            (&mut self.iban, update.iban),
            (&mut self.bic, update.bic),
        ];
        for (target, value) in fields {
            if let Some(value) = value {
                *target = value;
            }
        }
    }
}
