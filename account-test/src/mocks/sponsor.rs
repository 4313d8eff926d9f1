use async_trait::async_trait;
use mockall::*;

use account_core::*;

mock! {
    pub Sponsor {
        pub fn request_sponsorship(
            &self,
            operation: &Operation,
            context: &SponsorContext,
        ) -> Result<Sponsorship, SponsorError> {}
    }
}

impl std::fmt::Debug for MockSponsor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockSponsor")
    }
}

#[async_trait]
impl SponsorProvider for MockSponsor {
    async fn request_sponsorship(
        &self,
        operation: &Operation,
        context: &SponsorContext,
    ) -> Result<Sponsorship, SponsorError> {
        self.request_sponsorship(operation, context)
    }
}
