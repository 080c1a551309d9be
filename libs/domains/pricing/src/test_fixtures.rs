//! Small bulk documents shared by unit tests.

use serde_json::{json, Value};

use crate::catalog::CatalogIndex;

/// An EC2-shaped price list covering tiered, reserved, free and term-less products.
pub fn ec2_document() -> Value {
    json!({
        "formatVersion": "v1.0",
        "offerCode": "AmazonEC2",
        "version": "20240611000000",
        "publicationDate": "2024-06-11T00:00:00Z",
        "products": {
            "T3MICRO": {
                "sku": "T3MICRO",
                "productFamily": "Compute Instance",
                "attributes": {
                    "servicecode": "AmazonEC2",
                    "location": "US East (N. Virginia)",
                    "instanceType": "t3.micro",
                    "operatingSystem": "Linux",
                    "tenancy": "Shared"
                }
            },
            "T3MICROWIN": {
                "sku": "T3MICROWIN",
                "productFamily": "Compute Instance",
                "attributes": {
                    "servicecode": "AmazonEC2",
                    "location": "US East (N. Virginia)",
                    "instanceType": "t3.micro",
                    "operatingSystem": "Windows",
                    "tenancy": "Shared"
                }
            },
            "M5LARGE": {
                "sku": "M5LARGE",
                "productFamily": "Compute Instance",
                "attributes": {
                    "servicecode": "AmazonEC2",
                    "location": "US East (N. Virginia)",
                    "instanceType": "m5.large",
                    "operatingSystem": "Linux",
                    "tenancy": "Shared"
                }
            },
            "EBSGP2": {
                "sku": "EBSGP2",
                "productFamily": "Storage",
                "attributes": {
                    "servicecode": "AmazonEC2",
                    "location": "US East (N. Virginia)",
                    "volumeApiName": "gp2"
                }
            },
            "DTFREE": {
                "sku": "DTFREE",
                "productFamily": "Data Transfer",
                "attributes": {
                    "servicecode": "AWSDataTransfer",
                    "transferType": "AWS Inbound"
                }
            },
            "FEENOTERMS": {
                "sku": "FEENOTERMS",
                "productFamily": "Fee",
                "attributes": {
                    "servicecode": "AmazonEC2",
                    "location": "US East (N. Virginia)"
                }
            }
        },
        "terms": {
            "Reserved": {
                "T3MICRO": {
                    "T3MICRO.4NA7Y494T4": {
                        "offerTermCode": "4NA7Y494T4",
                        "sku": "T3MICRO",
                        "effectiveDate": "2024-06-01T00:00:00Z",
                        "priceDimensions": {
                            "T3MICRO.4NA7Y494T4.6YS6EN2CT7": {
                                "rateCode": "T3MICRO.4NA7Y494T4.6YS6EN2CT7",
                                "description": "Linux/UNIX (Amazon VPC), t3.micro reserved instance applied",
                                "beginRange": "0",
                                "endRange": "Inf",
                                "unit": "Hrs",
                                "pricePerUnit": { "USD": "0.0065000000" },
                                "appliesTo": []
                            }
                        },
                        "termAttributes": {
                            "LeaseContractLength": "1yr",
                            "OfferingClass": "standard",
                            "PurchaseOption": "No Upfront"
                        }
                    }
                }
            },
            "OnDemand": {
                "T3MICRO": {
                    "T3MICRO.JRTCKXETXF": {
                        "offerTermCode": "JRTCKXETXF",
                        "sku": "T3MICRO",
                        "effectiveDate": "2024-06-01T00:00:00Z",
                        "priceDimensions": {
                            "T3MICRO.JRTCKXETXF.6YS6EN2CT7": {
                                "rateCode": "T3MICRO.JRTCKXETXF.6YS6EN2CT7",
                                "description": "$0.0104 per On Demand Linux t3.micro Instance Hour",
                                "beginRange": "0",
                                "endRange": "Inf",
                                "unit": "Hrs",
                                "pricePerUnit": { "USD": "0.0104000000" },
                                "appliesTo": []
                            }
                        },
                        "termAttributes": {}
                    }
                },
                "T3MICROWIN": {
                    "T3MICROWIN.JRTCKXETXF": {
                        "offerTermCode": "JRTCKXETXF",
                        "sku": "T3MICROWIN",
                        "effectiveDate": "2024-06-01T00:00:00Z",
                        "priceDimensions": {
                            "T3MICROWIN.JRTCKXETXF.6YS6EN2CT7": {
                                "rateCode": "T3MICROWIN.JRTCKXETXF.6YS6EN2CT7",
                                "description": "$0.0196 per On Demand Windows t3.micro Instance Hour",
                                "beginRange": "0",
                                "endRange": "Inf",
                                "unit": "Hrs",
                                "pricePerUnit": { "USD": "0.0196000000" },
                                "appliesTo": []
                            }
                        },
                        "termAttributes": {}
                    }
                },
                "M5LARGE": {
                    "M5LARGE.JRTCKXETXF": {
                        "offerTermCode": "JRTCKXETXF",
                        "sku": "M5LARGE",
                        "effectiveDate": "2024-06-01T00:00:00Z",
                        "priceDimensions": {
                            "M5LARGE.JRTCKXETXF.6YS6EN2CT7": {
                                "rateCode": "M5LARGE.JRTCKXETXF.6YS6EN2CT7",
                                "description": "$0.096 per On Demand Linux m5.large Instance Hour",
                                "beginRange": "0",
                                "endRange": "Inf",
                                "unit": "Hrs",
                                "pricePerUnit": { "USD": "0.0960000000" },
                                "appliesTo": []
                            }
                        },
                        "termAttributes": {}
                    }
                },
                "EBSGP2": {
                    "EBSGP2.JRTCKXETXF": {
                        "offerTermCode": "JRTCKXETXF",
                        "sku": "EBSGP2",
                        "effectiveDate": "2024-06-01T00:00:00Z",
                        "priceDimensions": {
                            "EBSGP2.JRTCKXETXF.TIER2": {
                                "rateCode": "EBSGP2.JRTCKXETXF.TIER2",
                                "description": "$0.08 per GB-month beyond 1 TB",
                                "beginRange": "1024",
                                "endRange": "Inf",
                                "unit": "GB-Mo",
                                "pricePerUnit": { "USD": "0.0800000000" },
                                "appliesTo": []
                            },
                            "EBSGP2.JRTCKXETXF.TIER1": {
                                "rateCode": "EBSGP2.JRTCKXETXF.TIER1",
                                "description": "$0.10 per GB-month up to 1 TB",
                                "beginRange": "0",
                                "endRange": "1024",
                                "unit": "GB-Mo",
                                "pricePerUnit": { "USD": "0.1000000000" },
                                "appliesTo": []
                            }
                        },
                        "termAttributes": {}
                    }
                },
                "DTFREE": {
                    "DTFREE.JRTCKXETXF": {
                        "offerTermCode": "JRTCKXETXF",
                        "sku": "DTFREE",
                        "effectiveDate": "2024-06-01T00:00:00Z",
                        "priceDimensions": {
                            "DTFREE.JRTCKXETXF.6YS6EN2CT7": {
                                "rateCode": "DTFREE.JRTCKXETXF.6YS6EN2CT7",
                                "description": "$0.00 per GB - data transfer in",
                                "beginRange": "0",
                                "endRange": "Inf",
                                "unit": "GB",
                                "pricePerUnit": { "USD": "0.0000000000" },
                                "appliesTo": []
                            }
                        },
                        "termAttributes": {}
                    }
                }
            },
            "Spot": {}
        }
    })
}

pub fn ec2_index() -> CatalogIndex {
    CatalogIndex::build("AmazonEC2", "us-east-1", ec2_document())
        .expect("fixture document builds")
}
